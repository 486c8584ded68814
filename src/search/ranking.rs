use crate::analysis::{Analyzer, AnalyzerKind, StopwordSet};
use crate::core::types::DocId;
use crate::index::{composite_key, InvertedIndex};
use crate::query::ast::Query;
use crate::scoring::{DocStats, Scorer};
use crate::store::DocumentStore;

/// A document and its relevance score, generalized from the teacher's
/// `search::results::TopKCollector` (a binary-heap top-K collector tuned for
/// an incremental segment scan) to a sort over a fully materialized
/// candidate set, since this executor already produces the whole set before
/// ranking begins.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub doc_id: DocId,
    pub score: f32,
}

/// Recursively collects `(field, token)` pairs from the query nodes that
/// carry searchable text: `match`/`match_phrase`/`phrase` values are
/// word-split with the standard analyzer; `term`/`prefix`/`wildcard` values
/// are used as a single raw token.
pub fn extract_query_tokens(query: &Query) -> Vec<(String, String)> {
    let mut out = Vec::new();
    collect_tokens(query, &mut out);
    out
}

fn collect_tokens(query: &Query, out: &mut Vec<(String, String)>) {
    let standard = Analyzer::new(AnalyzerKind::Standard);
    let no_stopwords = StopwordSet::new();
    match query {
        Query::Match(q) => {
            for token in standard.tokenize(&q.value, &no_stopwords) {
                out.push((q.field.clone(), token.text));
            }
        }
        Query::Phrase(q) | Query::MatchPhrase(q) => {
            for word in &q.phrase {
                out.push((q.field.clone(), word.to_lowercase()));
            }
        }
        Query::Term(q) => out.push((q.field.clone(), q.value.to_lowercase())),
        Query::Prefix(q) => out.push((q.field.clone(), q.prefix.to_lowercase())),
        Query::Wildcard(q) => out.push((q.field.clone(), q.pattern.to_lowercase())),
        Query::Bool(q) => {
            for sub in q.must.iter().chain(&q.should).chain(&q.filter) {
                collect_tokens(sub, out);
            }
        }
        _ => {}
    }
}

/// Sums a scorer's per-token score across `tokens` for every doc in
/// `candidates`, preserving `candidates`' input order for the tie-break
/// `sort_by` (not `sort_unstable_by`) guarantees.
pub fn rank<S: Scorer>(
    candidates: &[DocId],
    tokens: &[(String, String)],
    scorer: &S,
    index: &InvertedIndex,
    documents: &DocumentStore,
    total_docs: usize,
    avg_doc_length: f32,
) -> Vec<ScoredDocument> {
    let mut scored: Vec<ScoredDocument> = candidates
        .iter()
        .map(|&doc_id| {
            let score = tokens
                .iter()
                .map(|(field, token)| {
                    let key = composite_key(field, token);
                    let doc_freq = index.doc_freq(&key);
                    let term_freq = index.term_frequency(&key, doc_id);
                    scorer.score(
                        field,
                        term_freq,
                        DocStats {
                            doc_freq,
                            total_docs,
                            doc_length: documents.doc_length(doc_id),
                            avg_doc_length,
                        },
                    )
                })
                .sum();
            ScoredDocument { doc_id, score }
        })
        .collect();

    if !tokens.is_empty() && scored.iter().all(|s| s.score == 0.0) {
        apply_fallback_scoring(&mut scored, tokens, documents);
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

/// Keeps boolean-matched documents from all collapsing to a zero score: a
/// raw term-frequency count over the document's serialized field values.
fn apply_fallback_scoring(
    scored: &mut [ScoredDocument],
    tokens: &[(String, String)],
    documents: &DocumentStore,
) {
    for entry in scored.iter_mut() {
        let Some(doc) = documents.get_by_doc_id(entry.doc_id) else {
            continue;
        };
        let serialized = serde_json::to_string(&doc.fields).unwrap_or_default().to_lowercase();
        let count: usize = tokens
            .iter()
            .map(|(_, token)| serialized.matches(&token.to_lowercase()).count())
            .sum();
        entry.score = count.max(1) as f32;
    }
}

/// Slices `[from, from + size)`; a zero or negative `size` returns empty.
pub fn paginate(ranked: &[ScoredDocument], from: usize, size: i64) -> Vec<ScoredDocument> {
    if size <= 0 || from >= ranked.len() {
        return Vec::new();
    }
    let end = (from + size as usize).min(ranked.len());
    ranked[from..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::{MatchQuery, PhraseQuery, TermQuery};

    #[test]
    fn extract_tokens_splits_match_values() {
        let query = Query::Match(MatchQuery { field: "body".into(), value: "Quick Fox".into(), operator: None, boost: None });
        let tokens = extract_query_tokens(&query);
        assert_eq!(tokens, vec![("body".to_string(), "quick".to_string()), ("body".to_string(), "fox".to_string())]);
    }

    #[test]
    fn extract_tokens_keeps_term_as_single_token() {
        let query = Query::Term(TermQuery { field: "status".into(), value: "Active".into(), boost: None });
        assert_eq!(extract_query_tokens(&query), vec![("status".to_string(), "active".to_string())]);
    }

    #[test]
    fn extract_tokens_recurses_into_bool_must() {
        let query = Query::Bool(crate::query::ast::BoolQuery::new().with_must(Query::Phrase(PhraseQuery {
            field: "body".into(),
            phrase: vec!["a".into(), "b".into()],
            slop: 0,
            boost: None,
        })));
        assert_eq!(extract_query_tokens(&query).len(), 2);
    }

    #[test]
    fn paginate_returns_empty_for_non_positive_size() {
        let docs = vec![ScoredDocument { doc_id: DocId(1), score: 1.0 }];
        assert!(paginate(&docs, 0, 0).is_empty());
        assert!(paginate(&docs, 0, -1).is_empty());
    }

    #[test]
    fn paginate_slices_within_bounds() {
        let docs: Vec<ScoredDocument> = (0..5).map(|i| ScoredDocument { doc_id: DocId(i), score: i as f32 }).collect();
        let page = paginate(&docs, 2, 2);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].doc_id, DocId(2));
    }
}

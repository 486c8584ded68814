use std::collections::HashSet;

use regex::Regex;

use crate::analysis::{AnalyzerRegistry, StopwordSet, SynonymMap};
use crate::core::hash::{haversine_km, levenshtein_distance};
use crate::core::types::{DocId, FieldValue};
use crate::index::{composite_key, InvertedIndex};
use crate::query::ast::*;
use crate::schema::{FieldType, MappingManager};
use crate::store::DocumentStore;

/// Everything the executor needs to evaluate a query tree, borrowed for the
/// duration of one `execute` call. Evaluates directly into `HashSet<DocId>`,
/// matching the teacher's `query::matcher::DocumentMatcher` set-evaluation
/// style (the teacher's `QueryPlanner`/`QueryOptimizer`/`LogicalPlan`
/// indirection is not carried forward: it round-trips to an identical query
/// with no optimization performed).
pub struct ExecutionContext<'a> {
    pub index: &'a InvertedIndex,
    pub documents: &'a DocumentStore,
    pub mapping: &'a MappingManager,
    pub analyzers: &'a AnalyzerRegistry,
    pub stopwords: &'a StopwordSet,
    pub synonyms: &'a SynonymMap,
}

impl<'a> ExecutionContext<'a> {
    fn analyzer_name(&self, field: &str) -> String {
        self.mapping
            .get(field)
            .and_then(|m| m.analyzer.clone())
            .unwrap_or_else(|| "standard".to_string())
    }

    fn field_type(&self, field: &str) -> Option<FieldType> {
        self.mapping.get(field).map(|m| m.field_type)
    }

    fn token_doc_ids(&self, field: &str, token: &str) -> HashSet<DocId> {
        let mut out: HashSet<DocId> = self
            .index
            .get_posting(&composite_key(field, token))
            .doc_ids()
            .collect();
        for synonym in self.synonyms.get(token) {
            out.extend(self.index.get_posting(&composite_key(field, &synonym)).doc_ids());
        }
        out
    }
}

/// Unknown node kinds and malformed children yield the empty set rather
/// than raising; scan-based nodes short-circuit to empty if the document
/// store is empty.
pub fn execute(query: &Query, ctx: &ExecutionContext) -> HashSet<DocId> {
    match query {
        Query::MatchAll => ctx.documents.all_doc_ids(),
        Query::Match(q) => execute_match(q, ctx),
        Query::Term(q) => execute_term(q, ctx),
        Query::Range(q) => execute_range(q, ctx),
        Query::Prefix(q) => execute_prefix(q, ctx),
        Query::Wildcard(q) => execute_wildcard(q, ctx),
        Query::Fuzzy(q) => execute_fuzzy(q, ctx),
        Query::Phrase(q) | Query::MatchPhrase(q) => execute_phrase(q, ctx),
        Query::GeoDistance(q) => execute_geo_distance(q, ctx),
        Query::Exists(q) => execute_exists(q, ctx),
        Query::Bool(q) => execute_bool(q, ctx),
    }
}

fn execute_match(q: &MatchQuery, ctx: &ExecutionContext) -> HashSet<DocId> {
    if q.field.is_empty() {
        return HashSet::new();
    }
    let analyzer = ctx.analyzers.get(&ctx.analyzer_name(&q.field));
    let tokens = analyzer.tokenize(&q.value, ctx.stopwords);
    if tokens.is_empty() {
        return ctx.documents.all_doc_ids();
    }

    let or_mode = q.operator.as_deref().map(|o| o.eq_ignore_ascii_case("or")).unwrap_or(false);
    let mut sets = tokens.iter().map(|t| ctx.token_doc_ids(&q.field, &t.text));
    let Some(first) = sets.next() else {
        return ctx.documents.all_doc_ids();
    };
    sets.fold(first, |acc, set| {
        if or_mode {
            acc.union(&set).copied().collect()
        } else {
            acc.intersection(&set).copied().collect()
        }
    })
}

fn execute_term(q: &TermQuery, ctx: &ExecutionContext) -> HashSet<DocId> {
    if q.field.is_empty() {
        return HashSet::new();
    }
    let value = if ctx.field_type(&q.field) == Some(FieldType::Keyword) {
        q.value.clone()
    } else {
        q.value.to_lowercase()
    };
    ctx.index.get_posting(&composite_key(&q.field, &value)).doc_ids().collect()
}

fn execute_range(q: &RangeQuery, ctx: &ExecutionContext) -> HashSet<DocId> {
    if q.field.is_empty() || ctx.documents.count() == 0 {
        return HashSet::new();
    }
    ctx.documents
        .iter()
        .filter_map(|(_, doc)| {
            let value = doc.get_field(&q.field)?;
            if in_range(value, q) {
                ctx.documents.doc_id(&doc.id)
            } else {
                None
            }
        })
        .collect()
}

fn in_range(value: &FieldValue, q: &RangeQuery) -> bool {
    let cmp = |bound: &FieldValue| -> Option<std::cmp::Ordering> { compare_values(value, bound) };
    if let Some(b) = &q.gt
        && cmp(b) != Some(std::cmp::Ordering::Greater) {
            return false;
        }
    if let Some(b) = &q.gte
        && !matches!(cmp(b), Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)) {
            return false;
        }
    if let Some(b) = &q.lt
        && cmp(b) != Some(std::cmp::Ordering::Less) {
            return false;
        }
    if let Some(b) = &q.lte
        && !matches!(cmp(b), Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)) {
            return false;
        }
    true
}

/// Numeric comparison for numeric/date fields, code-unit order for strings.
fn compare_values(a: &FieldValue, b: &FieldValue) -> Option<std::cmp::Ordering> {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => match (a.as_str(), b.as_str()) {
            (Some(x), Some(y)) => Some(x.cmp(y)),
            _ => None,
        },
    }
}

fn execute_prefix(q: &PrefixQuery, ctx: &ExecutionContext) -> HashSet<DocId> {
    if q.field.is_empty() || q.prefix.trim().is_empty() {
        return HashSet::new();
    }
    let words: Vec<&str> = q.prefix.split_whitespace().collect();
    let field_tokens = ctx.index.get_field_tokens(&q.field);
    let prefix_field = format!("{}:", q.field);

    let mut sets = words.iter().map(|word| {
        let word = word.to_lowercase();
        let mut out = HashSet::new();
        for key in &field_tokens {
            let Some(term) = key.strip_prefix(&prefix_field) else {
                continue;
            };
            if term.starts_with(&word) {
                out.extend(ctx.index.get_posting(key).doc_ids());
            }
        }
        out
    });
    let Some(first) = sets.next() else {
        return HashSet::new();
    };
    sets.fold(first, |acc, set| acc.intersection(&set).copied().collect())
}

/// Multi-word patterns combine per-word sets by intersection, the same rule
/// `execute_prefix` follows.
fn execute_wildcard(q: &WildcardQuery, ctx: &ExecutionContext) -> HashSet<DocId> {
    if q.field.is_empty() || q.pattern.trim().is_empty() {
        return HashSet::new();
    }
    let words: Vec<&str> = q.pattern.split_whitespace().collect();
    let mut sets = words.iter().map(|word| wildcard_word_matches(&q.field, word, ctx));
    let Some(first) = sets.next() else {
        return HashSet::new();
    };
    sets.fold(first, |acc, set| acc.intersection(&set).copied().collect())
}

fn wildcard_word_matches(field: &str, word: &str, ctx: &ExecutionContext) -> HashSet<DocId> {
    let Some(regex) = wildcard_to_regex(word) else {
        return HashSet::new();
    };

    if is_simple_wildcard(word) {
        let prefix_field = format!("{field}:");
        ctx.index
            .get_field_tokens(field)
            .into_iter()
            .filter_map(|key| {
                let term = key.strip_prefix(&prefix_field)?;
                regex.is_match(term).then(|| ctx.index.get_posting(&key).doc_ids().collect::<Vec<_>>())
            })
            .flatten()
            .collect()
    } else {
        if ctx.documents.count() == 0 {
            return HashSet::new();
        }
        ctx.documents
            .iter()
            .filter_map(|(_, doc)| {
                let value = doc.get_field(field)?.as_str()?;
                regex.is_match(value).then(|| ctx.documents.doc_id(&doc.id)).flatten()
            })
            .collect()
    }
}

fn is_simple_wildcard(pattern: &str) -> bool {
    pattern
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '*' | '?' | '_' | '-'))
}

fn wildcard_to_regex(pattern: &str) -> Option<Regex> {
    let mut out = String::from("(?i)^");
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).ok()
}

/// Multi-word terms combine per-word sets by intersection, the same rule
/// `execute_prefix` follows.
fn execute_fuzzy(q: &FuzzyQuery, ctx: &ExecutionContext) -> HashSet<DocId> {
    if q.field.is_empty() || q.term.trim().is_empty() {
        return HashSet::new();
    }
    let fuzziness = q.fuzziness.unwrap_or(2) as usize;
    let prefix_field = format!("{}:", q.field);

    let mut sets = q.term.split_whitespace().map(|word| {
        let target = word.to_lowercase();
        ctx.index
            .get_field_tokens(&q.field)
            .into_iter()
            .filter_map(|key| {
                let term = key.strip_prefix(&prefix_field)?;
                (levenshtein_distance(term, &target) <= fuzziness)
                    .then(|| ctx.index.get_posting(&key).doc_ids().collect::<Vec<_>>())
            })
            .flatten()
            .collect::<HashSet<DocId>>()
    });
    let Some(first) = sets.next() else {
        return HashSet::new();
    };
    sets.fold(first, |acc, set| acc.intersection(&set).copied().collect())
}

fn execute_phrase(q: &PhraseQuery, ctx: &ExecutionContext) -> HashSet<DocId> {
    if q.field.is_empty() || q.phrase.is_empty() {
        return HashSet::new();
    }
    let keys: Vec<String> = q.phrase.iter().map(|t| composite_key(&q.field, t)).collect();

    let mut candidates: Option<HashSet<DocId>> = None;
    for key in &keys {
        let docs: HashSet<DocId> = ctx.index.get_posting(key).doc_ids().collect();
        candidates = Some(match candidates {
            Some(acc) => acc.intersection(&docs).copied().collect(),
            None => docs,
        });
    }
    let Some(candidates) = candidates else {
        return HashSet::new();
    };

    candidates
        .into_iter()
        .filter(|&doc_id| phrase_matches_doc(&keys, doc_id, q.slop, ctx))
        .collect()
}

fn phrase_matches_doc(keys: &[String], doc_id: DocId, slop: u32, ctx: &ExecutionContext) -> bool {
    let position_lists: Vec<Vec<u32>> = keys.iter().map(|k| ctx.index.get_positions(k, doc_id)).collect();
    if position_lists.iter().any(|p| p.is_empty()) {
        return false;
    }
    let slop = slop as i64;
    position_lists[0].iter().any(|&start| {
        (1..position_lists.len()).all(|i| {
            let expected = start as i64 + i as i64;
            position_lists[i]
                .iter()
                .any(|&p| (p as i64 - expected).abs() <= slop)
        })
    })
}

fn execute_geo_distance(q: &GeoDistanceQuery, ctx: &ExecutionContext) -> HashSet<DocId> {
    if q.field.is_empty() || ctx.documents.count() == 0 {
        return HashSet::new();
    }
    ctx.documents
        .iter()
        .filter_map(|(_, doc)| {
            let point = doc.get_field(&q.field)?.as_geo_point()?;
            let distance = haversine_km((q.lat, q.lon), point);
            (distance <= q.distance_km).then(|| ctx.documents.doc_id(&doc.id)).flatten()
        })
        .collect()
}

fn execute_exists(q: &ExistsQuery, ctx: &ExecutionContext) -> HashSet<DocId> {
    if q.field.is_empty() {
        return HashSet::new();
    }
    ctx.documents
        .iter()
        .filter_map(|(_, doc)| {
            let present = doc.get_field(&q.field).map(|v| !v.is_null()).unwrap_or(false);
            present.then(|| ctx.documents.doc_id(&doc.id)).flatten()
        })
        .collect()
}

fn execute_bool(q: &BoolQuery, ctx: &ExecutionContext) -> HashSet<DocId> {
    let must_sets: Vec<HashSet<DocId>> = q.must.iter().map(|sub| execute(sub, ctx)).collect();
    let should_sets: Vec<HashSet<DocId>> = q.should.iter().map(|sub| execute(sub, ctx)).collect();
    let must_not_sets: Vec<HashSet<DocId>> = q.must_not.iter().map(|sub| execute(sub, ctx)).collect();
    let filter_sets: Vec<HashSet<DocId>> = q.filter.iter().map(|sub| execute(sub, ctx)).collect();

    let mut base = if !must_sets.is_empty() {
        intersect_all(&must_sets)
    } else if !should_sets.is_empty() {
        let min_should_match = q
            .minimum_should_match
            .unwrap_or(if must_sets.is_empty() { 1 } else { 0 }) as usize;
        union_with_min_match(&should_sets, min_should_match)
    } else {
        HashSet::new()
    };

    for set in &must_not_sets {
        base = base.difference(set).copied().collect();
    }

    if !filter_sets.is_empty() {
        let filter_intersection = intersect_all(&filter_sets);
        base = base.intersection(&filter_intersection).copied().collect();
    }

    base
}

fn intersect_all(sets: &[HashSet<DocId>]) -> HashSet<DocId> {
    let mut iter = sets.iter();
    let Some(first) = iter.next() else {
        return HashSet::new();
    };
    iter.fold(first.clone(), |acc, set| acc.intersection(set).copied().collect())
}

fn union_with_min_match(sets: &[HashSet<DocId>], min_match: usize) -> HashSet<DocId> {
    let mut counts: std::collections::HashMap<DocId, usize> = std::collections::HashMap::new();
    for set in sets {
        for &doc_id in set {
            *counts.entry(doc_id).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count >= min_match.max(1))
        .map(|(doc_id, _)| doc_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::IndexSettings;

    fn fixture() -> (InvertedIndex, DocumentStore, MappingManager, AnalyzerRegistry, StopwordSet, SynonymMap) {
        let settings = IndexSettings::default();
        let mut index = InvertedIndex::new(settings.num_shards, settings.position_compression_threshold);
        let mut documents = DocumentStore::new();
        let mapping = MappingManager::new();
        let analyzers = AnalyzerRegistry::new();
        let stopwords = StopwordSet::english();
        let synonyms = SynonymMap::new();

        for (id, body) in [("d1", "the quick brown fox"), ("d2", "quick rust programs"), ("d3", "slow turtle")] {
            let doc = crate::core::types::Document::new(id, "idx");
            let doc_id = documents.put(doc, 4);
            let analyzer = analyzers.get("standard");
            for tok in analyzer.tokenize(body, &stopwords) {
                index.add_token("body", &tok.text, doc_id, tok.position);
            }
        }
        (index, documents, mapping, analyzers, stopwords, synonyms)
    }

    #[test]
    fn match_all_returns_every_document() {
        let (index, documents, mapping, analyzers, stopwords, synonyms) = fixture();
        let ctx = ExecutionContext { index: &index, documents: &documents, mapping: &mapping, analyzers: &analyzers, stopwords: &stopwords, synonyms: &synonyms };
        assert_eq!(execute(&Query::MatchAll, &ctx).len(), 3);
    }

    #[test]
    fn match_intersects_multiple_tokens_by_default() {
        let (index, documents, mapping, analyzers, stopwords, synonyms) = fixture();
        let ctx = ExecutionContext { index: &index, documents: &documents, mapping: &mapping, analyzers: &analyzers, stopwords: &stopwords, synonyms: &synonyms };
        let result = execute(&Query::Match(MatchQuery { field: "body".into(), value: "quick rust".into(), operator: None, boost: None }), &ctx);
        assert_eq!(result.len(), 1);
        assert_eq!(result.into_iter().next().unwrap(), documents.doc_id("d2").unwrap());
    }

    #[test]
    fn match_or_operator_unions_tokens() {
        let (index, documents, mapping, analyzers, stopwords, synonyms) = fixture();
        let ctx = ExecutionContext { index: &index, documents: &documents, mapping: &mapping, analyzers: &analyzers, stopwords: &stopwords, synonyms: &synonyms };
        let result = execute(&Query::Match(MatchQuery { field: "body".into(), value: "fox turtle".into(), operator: Some("or".into()), boost: None }), &ctx);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn bool_must_not_excludes_matches() {
        let (index, documents, mapping, analyzers, stopwords, synonyms) = fixture();
        let ctx = ExecutionContext { index: &index, documents: &documents, mapping: &mapping, analyzers: &analyzers, stopwords: &stopwords, synonyms: &synonyms };
        let query = Query::Bool(BoolQuery::new()
            .with_must(Query::MatchAll)
            .with_must_not(Query::Term(TermQuery { field: "body".into(), value: "fox".into(), boost: None })));
        let result = execute(&query, &ctx);
        assert_eq!(result.len(), 2);
        assert!(!result.contains(&documents.doc_id("d1").unwrap()));
    }

    #[test]
    fn fuzzy_matches_within_edit_distance() {
        let (index, documents, mapping, analyzers, stopwords, synonyms) = fixture();
        let ctx = ExecutionContext { index: &index, documents: &documents, mapping: &mapping, analyzers: &analyzers, stopwords: &stopwords, synonyms: &synonyms };
        let result = execute(&Query::Fuzzy(FuzzyQuery { field: "body".into(), term: "fox".into(), fuzziness: Some(1), boost: None }), &ctx);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn prefix_matches_token_start() {
        let (index, documents, mapping, analyzers, stopwords, synonyms) = fixture();
        let ctx = ExecutionContext { index: &index, documents: &documents, mapping: &mapping, analyzers: &analyzers, stopwords: &stopwords, synonyms: &synonyms };
        let result = execute(&Query::Prefix(PrefixQuery { field: "body".into(), prefix: "qui".into(), boost: None }), &ctx);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn phrase_requires_adjacent_positions() {
        let (index, documents, mapping, analyzers, stopwords, synonyms) = fixture();
        let ctx = ExecutionContext { index: &index, documents: &documents, mapping: &mapping, analyzers: &analyzers, stopwords: &stopwords, synonyms: &synonyms };
        let result = execute(&Query::Phrase(PhraseQuery { field: "body".into(), phrase: vec!["quick".into(), "brown".into()], slop: 0, boost: None }), &ctx);
        assert_eq!(result.len(), 1);
        assert_eq!(result.into_iter().next().unwrap(), documents.doc_id("d1").unwrap());
    }

    #[test]
    fn unknown_field_yields_empty_set() {
        let (index, documents, mapping, analyzers, stopwords, synonyms) = fixture();
        let ctx = ExecutionContext { index: &index, documents: &documents, mapping: &mapping, analyzers: &analyzers, stopwords: &stopwords, synonyms: &synonyms };
        let result = execute(&Query::Term(TermQuery { field: "".into(), value: "x".into(), boost: None }), &ctx);
        assert!(result.is_empty());
    }
}

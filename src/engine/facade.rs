use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::config::IndexSettings;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Document};
use crate::engine::index_handle::NamedIndex;
use crate::engine::snapshot::{AppendRecord, FileSnapshotSink, PersistenceSink, Snapshot};
use crate::facet::{Aggregation, AggregationResult};
use crate::query::ast::{BoolQuery, MatchQuery, Query};
use crate::query::executor::{execute, ExecutionContext};
use crate::schema::FieldType;
use crate::scoring::BM25Scorer;
use crate::search::{extract_query_tokens, paginate, rank};

/// A query as accepted by `SearchEngine::search`: either an explicit tree,
/// a bare string rewritten to a multi-field boolean, or nothing (match all).
pub enum SearchQuery {
    Tree(Query),
    Text(String),
    Empty,
}

pub struct SearchRequest {
    pub query: SearchQuery,
    pub from: usize,
    pub size: i64,
    pub operator: Option<String>,
    pub include_facets: bool,
    pub aggregations: Vec<(String, Aggregation)>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest {
            query: SearchQuery::Empty,
            from: 0,
            size: 10,
            operator: None,
            include_facets: false,
            aggregations: Vec::new(),
        }
    }
}

pub struct SearchHit {
    pub document: Document,
    pub score: f32,
}

pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub total: usize,
    pub from: usize,
    pub size: i64,
    pub facets: Option<HashMap<String, HashMap<String, usize>>>,
    pub aggregations: Option<HashMap<String, AggregationResult>>,
}

#[derive(Debug, Clone)]
pub struct IndexStats {
    pub total_docs: usize,
    pub avg_doc_length: f32,
    pub num_shards: usize,
    pub needs_rebalance: bool,
}

/// The facade grounded on the teacher's `Database` shape, with the
/// MVCC/WAL/segment/reader-pool machinery that backed the teacher's single
/// implicit index replaced by a map of named indexes, each its own
/// `RwLock`-guarded bundle — directly implementing the single-logical-
/// writer, multi-reader rule per named index without snapshot-isolated
/// MVCC versioning (out of scope here).
pub struct SearchEngine {
    indices: RwLock<HashMap<String, Arc<NamedIndex>>>,
    persistence_dir: Option<PathBuf>,
    shut_down: AtomicBool,
}

impl SearchEngine {
    pub fn new() -> Self {
        SearchEngine {
            indices: RwLock::new(HashMap::new()),
            persistence_dir: None,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn with_persistence(dir: impl Into<PathBuf>) -> Self {
        SearchEngine {
            indices: RwLock::new(HashMap::new()),
            persistence_dir: Some(dir.into()),
            shut_down: AtomicBool::new(false),
        }
    }

    fn check_alive(&self) -> Result<()> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(Error::state("engine has been shut down"));
        }
        Ok(())
    }

    pub fn create_index(&self, settings: IndexSettings) -> Result<()> {
        self.check_alive()?;
        settings.validate()?;
        let mut indices = self.indices.write();
        indices
            .entry(settings.index_name.clone())
            .or_insert_with(|| Arc::new(NamedIndex::new(settings)));
        Ok(())
    }

    /// Idempotent `createIndex`: a no-op if the index already exists.
    pub fn ensure_index(&self, settings: IndexSettings) -> Result<()> {
        self.create_index(settings)
    }

    pub fn delete_index(&self, name: &str) -> Result<()> {
        self.check_alive()?;
        let mut indices = self.indices.write();
        if indices.remove(name).is_none() {
            return Err(Error::not_found(format!("index '{name}' does not exist")));
        }
        Ok(())
    }

    pub fn list_indices(&self) -> Vec<String> {
        self.indices.read().keys().cloned().collect()
    }

    fn get_index(&self, name: &str) -> Result<Arc<NamedIndex>> {
        self.indices
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("index '{name}' does not exist")))
    }

    /// Mutates the index under its write lock, then appends to the
    /// persistence log (if configured) so `initialize` can replay writes
    /// made since the last `flush`.
    #[tracing::instrument(skip(self, doc), fields(index = index_name, doc_id = %doc.id))]
    pub fn add(&self, index_name: &str, doc: Document) -> Result<DocId> {
        self.check_alive()?;
        let handle = self.get_index(index_name)?;
        let append_doc = doc.clone();
        let result = handle.state.write().add(doc);
        if let Err(ref err) = result {
            tracing::warn!(%err, "document rejected");
            return result;
        }
        if let Some(sink) = self.sink_for(index_name) {
            sink.append(&AppendRecord::Add { doc: append_doc })?;
        }
        result
    }

    #[tracing::instrument(skip(self), fields(index = index_name))]
    pub fn delete(&self, index_name: &str, id: &str) -> Result<bool> {
        self.check_alive()?;
        let handle = self.get_index(index_name)?;
        let removed = handle.state.write().delete(id);
        tracing::debug!(removed, "delete");
        if removed && let Some(sink) = self.sink_for(index_name) {
            sink.append(&AppendRecord::Delete { doc_id: id.to_string() })?;
        }
        Ok(removed)
    }

    pub fn get_stats(&self, index_name: &str) -> Result<IndexStats> {
        self.check_alive()?;
        let handle = self.get_index(index_name)?;
        let state = handle.state.read();
        Ok(IndexStats {
            total_docs: state.documents.count(),
            avg_doc_length: state.documents.average_doc_length(),
            num_shards: state.index.num_shards(),
            needs_rebalance: state.index.needs_rebalance(),
        })
    }

    pub fn get_facets(&self, index_name: &str, query: &Query) -> Result<HashMap<String, HashMap<String, usize>>> {
        self.check_alive()?;
        let handle = self.get_index(index_name)?;
        let state = handle.state.read();
        let ctx = ExecutionContext {
            index: &state.index,
            documents: &state.documents,
            mapping: &state.mappings,
            analyzers: &state.analyzers,
            stopwords: &state.stopwords,
            synonyms: &state.synonyms,
        };
        let candidates = execute(query, &ctx);
        Ok(state.facets.facets(&candidates))
    }

    /// Implements the five-step `search` pipeline from the facade spec.
    #[tracing::instrument(skip(self, request), fields(index = index_name, from = request.from, size = request.size))]
    pub fn search(&self, index_name: &str, request: SearchRequest) -> Result<SearchResponse> {
        self.check_alive()?;
        let handle = self.get_index(index_name)?;
        let state = handle.state.read();

        let query_tree = match request.query {
            SearchQuery::Empty => Query::MatchAll,
            SearchQuery::Tree(q) => q,
            SearchQuery::Text(text) => {
                if text.trim().is_empty() {
                    Query::MatchAll
                } else {
                    rewrite_text_query(&text, &state.mappings, request.operator.as_deref(), &state.stopwords, &state.analyzers)
                }
            }
        };

        let ctx = ExecutionContext {
            index: &state.index,
            documents: &state.documents,
            mapping: &state.mappings,
            analyzers: &state.analyzers,
            stopwords: &state.stopwords,
            synonyms: &state.synonyms,
        };
        let candidates: HashSet<DocId> = execute(&query_tree, &ctx);
        let total = candidates.len();

        let mut ordered: Vec<DocId> = candidates.iter().copied().collect();
        ordered.sort_by_key(|d| d.value());

        let scorer = BM25Scorer::new(state.settings.scorer.clone());
        let tokens = extract_query_tokens(&query_tree);
        let ranked = rank(
            &ordered,
            &tokens,
            &scorer,
            &state.index,
            &state.documents,
            state.documents.count(),
            state.documents.average_doc_length(),
        );
        let page = paginate(&ranked, request.from, request.size);

        let hits: Vec<SearchHit> = page
            .into_iter()
            .filter_map(|scored| {
                state
                    .documents
                    .get_by_doc_id(scored.doc_id)
                    .map(|doc| SearchHit { document: doc.clone(), score: scored.score })
            })
            .collect();

        let facets = request.include_facets.then(|| state.facets.facets(&candidates));

        let aggregations = (!request.aggregations.is_empty()).then(|| {
            let universe = state.documents.all_doc_ids();
            let lookup = |doc_id: DocId, field: &str| {
                state.documents.get_by_doc_id(doc_id).and_then(|d| d.get_field(field).cloned())
            };
            request
                .aggregations
                .iter()
                .map(|(name, agg)| (name.clone(), agg.run(&candidates, &universe, &lookup)))
                .collect::<HashMap<_, _>>()
        });

        tracing::debug!(total, returned = hits.len(), "search complete");
        Ok(SearchResponse {
            hits,
            total,
            from: request.from,
            size: request.size,
            facets,
            aggregations,
        })
    }

    fn sink_for(&self, index_name: &str) -> Option<FileSnapshotSink> {
        self.persistence_dir
            .as_ref()
            .map(|dir| FileSnapshotSink::new(dir, index_name))
    }

    /// Writes a fresh snapshot and truncates the append log, since the
    /// snapshot now captures every record the log would replay.
    #[tracing::instrument(skip(self), fields(index = index_name))]
    pub fn flush(&self, index_name: &str) -> Result<()> {
        self.check_alive()?;
        let handle = self.get_index(index_name)?;
        let state = handle.state.read();
        let Some(sink) = self.sink_for(index_name) else {
            tracing::debug!("no persistence configured, flush is a no-op");
            return Ok(());
        };
        let snapshot = Snapshot::build(index_name, &state.documents, &state.index, &state.mappings, &state.settings.facet_fields);
        sink.write_snapshot(&snapshot)?;
        sink.clear_append_log()?;
        tracing::info!(docs = state.documents.count(), "snapshot written");
        Ok(())
    }

    /// Loads the persisted snapshot (if any) and replays the append log on
    /// top of it, creating the index if it doesn't exist yet.
    pub fn initialize(&self, settings: IndexSettings) -> Result<()> {
        self.check_alive()?;
        let index_name = settings.index_name.clone();
        self.ensure_index(settings.clone())?;
        let Some(sink) = self.sink_for(&index_name) else {
            return Ok(());
        };

        let handle = self.get_index(&index_name)?;
        if let Some(snapshot) = sink.read_snapshot()? {
            let (documents, index, mappings, facets) = snapshot.restore(&settings);
            let mut state = handle.state.write();
            state.documents = documents;
            state.index = index;
            state.mappings = mappings;
            state.facets = facets;
        }

        for record in sink.read_append_log()? {
            let mut state = handle.state.write();
            match record {
                AppendRecord::Add { doc } => {
                    state.add(doc)?;
                }
                AppendRecord::Delete { doc_id } => {
                    state.delete(&doc_id);
                }
            }
        }
        Ok(())
    }

    pub fn clean(&self, index_name: &str) -> Result<()> {
        self.check_alive()?;
        let handle = self.get_index(index_name)?;
        {
            let mut state = handle.state.write();
            state.clear();
        }
        if let Some(sink) = self.sink_for(index_name) {
            sink.clear()?;
        }
        Ok(())
    }

    /// Flushes every index to persistence, then marks the engine dead:
    /// subsequent calls surface `ErrorKind::InvalidState`.
    pub fn shutdown(&self) -> Result<()> {
        self.check_alive()?;
        let names: Vec<String> = self.list_indices();
        for name in names {
            self.flush(&name)?;
        }
        self.shut_down.store(true, Ordering::Release);
        Ok(())
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn rewrite_text_query(
    text: &str,
    mappings: &crate::schema::MappingManager,
    operator: Option<&str>,
    stopwords: &crate::analysis::StopwordSet,
    analyzers: &crate::analysis::AnalyzerRegistry,
) -> Query {
    let text_fields: Vec<String> = mappings
        .fields()
        .filter(|m| m.field_type == FieldType::Text)
        .map(|m| m.name.clone())
        .collect();
    if text_fields.is_empty() {
        return Query::MatchAll;
    }

    let or_mode = operator.map(|o| o.eq_ignore_ascii_case("or")).unwrap_or(false);
    let mut bool_query = BoolQuery::new();

    if or_mode {
        let analyzer = analyzers.get("standard");
        for field in &text_fields {
            for token in analyzer.tokenize(text, stopwords) {
                bool_query = bool_query.with_should(Query::Match(MatchQuery {
                    field: field.clone(),
                    value: token.text,
                    operator: Some("or".to_string()),
                    boost: None,
                }));
            }
        }
    } else {
        for field in &text_fields {
            bool_query = bool_query.with_should(Query::Match(MatchQuery {
                field: field.clone(),
                value: text.to_string(),
                operator: None,
                boost: None,
            }));
        }
    }

    Query::Bool(bool_query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, title: &str) -> Document {
        Document::from_json(json!({"id": id, "title": title}), "idx").unwrap()
    }

    #[test]
    fn create_add_and_search_round_trip() {
        let engine = SearchEngine::new();
        engine.create_index(IndexSettings { index_name: "idx".into(), ..Default::default() }).unwrap();
        engine.add("idx", doc("d1", "rust powered search engine")).unwrap();

        let response = engine
            .search(
                "idx",
                SearchRequest { query: SearchQuery::Text("rust".into()), ..Default::default() },
            )
            .unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.hits.len(), 1);
        assert_eq!(response.hits[0].document.id, "d1");
    }

    #[test]
    fn missing_index_errors() {
        let engine = SearchEngine::new();
        assert!(engine.add("ghost", doc("d1", "x")).is_err());
    }

    #[test]
    fn shutdown_rejects_further_operations() {
        let engine = SearchEngine::new();
        engine.create_index(IndexSettings { index_name: "idx".into(), ..Default::default() }).unwrap();
        engine.shutdown().unwrap();
        assert!(engine.add("idx", doc("d1", "x")).is_err());
    }

    #[test]
    fn flush_and_initialize_round_trip_via_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let engine = SearchEngine::with_persistence(dir.path());
        engine.create_index(IndexSettings { index_name: "idx".into(), ..Default::default() }).unwrap();
        engine.add("idx", doc("d1", "durable rust index")).unwrap();
        engine.flush("idx").unwrap();

        let engine2 = SearchEngine::with_persistence(dir.path());
        engine2.initialize(IndexSettings { index_name: "idx".into(), ..Default::default() }).unwrap();
        let response = engine2
            .search("idx", SearchRequest { query: SearchQuery::Text("rust".into()), ..Default::default() })
            .unwrap();
        assert_eq!(response.total, 1);
    }

    #[test]
    fn empty_query_returns_all_documents_paginated() {
        let engine = SearchEngine::new();
        engine.create_index(IndexSettings { index_name: "idx".into(), ..Default::default() }).unwrap();
        engine.add("idx", doc("d1", "alpha")).unwrap();
        engine.add("idx", doc("d2", "beta")).unwrap();
        let response = engine.search("idx", SearchRequest::default()).unwrap();
        assert_eq!(response.total, 2);
    }
}

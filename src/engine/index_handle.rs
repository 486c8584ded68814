use std::collections::HashSet;

use parking_lot::RwLock;

use crate::analysis::{AnalyzerRegistry, StopwordSet, SynonymMap};
use crate::core::config::IndexSettings;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Document};
use crate::facet::FacetIndex;
use crate::index::InvertedIndex;
use crate::schema::{FieldType, MappingManager};
use crate::store::DocumentStore;

/// Everything one named index owns, guarded by a single lock so a reader
/// never observes a partial mutation across the index/store/facets/stats —
/// the coarse-but-consistent model §5 asks for, grounded on the teacher's
/// `parking_lot::RwLock`-guarded `reader_pool`/`memory_pool` components.
pub struct IndexState {
    pub settings: IndexSettings,
    pub documents: DocumentStore,
    pub index: InvertedIndex,
    pub mappings: MappingManager,
    pub facets: FacetIndex,
    pub stopwords: StopwordSet,
    pub synonyms: SynonymMap,
    pub analyzers: AnalyzerRegistry,
    term_doc_frequencies: std::collections::HashMap<String, usize>,
}

impl IndexState {
    pub fn new(settings: IndexSettings) -> Self {
        let stopwords = StopwordSet::english();
        IndexState {
            index: InvertedIndex::new(settings.effective_num_shards(), settings.position_compression_threshold),
            documents: DocumentStore::new(),
            mappings: MappingManager::new(),
            facets: FacetIndex::new(),
            stopwords,
            synonyms: SynonymMap::new(),
            analyzers: AnalyzerRegistry::new(),
            term_doc_frequencies: std::collections::HashMap::new(),
            settings,
        }
    }

    /// Implements the `add` pipeline from the engine facade: re-mapping,
    /// per-field tokenization and indexing, doc-length accounting, facet
    /// updates, and stopword auto-detection, all under one write lock.
    pub fn add(&mut self, doc: Document) -> Result<DocId> {
        if doc.id.is_empty() {
            return Err(Error::validation("document is missing a non-empty id"));
        }
        if self.documents.exists(&doc.id) {
            self.delete(&doc.id);
        }

        if self.settings.auto_map || self.settings.auto_extend {
            self.mappings.auto_map(&doc);
        }
        self.mappings.validate(&doc)?;

        let mut token_count = 0u32;
        let mut field_tokens: Vec<(String, Vec<crate::analysis::Token>)> = Vec::new();
        for (field, value) in &doc.fields {
            let Some(field_type) = self.mappings.get(field).map(|m| m.field_type) else {
                continue;
            };
            if !is_token_indexed(field_type) {
                continue;
            }
            let Some(text) = value.as_str() else { continue };
            let analyzer_name = self
                .mappings
                .get(field)
                .and_then(|m| m.analyzer.clone())
                .unwrap_or_else(|| default_analyzer_name(field_type).to_string());
            let analyzer = self.analyzers.get(&analyzer_name);
            let tokens = analyzer.tokenize(text, &self.stopwords);
            token_count += tokens.len() as u32;
            field_tokens.push((field.clone(), tokens));
        }

        let doc_id = self.documents.put(doc.clone(), token_count);
        for (field, tokens) in &field_tokens {
            for token in tokens {
                self.index.add_token(field, &token.text, doc_id, token.position);
                *self.term_doc_frequencies.entry(token.text.clone()).or_insert(0) += 1;
            }
        }

        for field in self.settings.facet_fields.clone() {
            if let Some(value) = doc.get_field(&field) {
                self.facets.index_field(doc_id, &field, value);
            }
        }

        if self.settings.stopwords.auto_save {
            self.stopwords.auto_detect(
                &self.term_doc_frequencies,
                self.documents.count(),
                self.settings.stopwords.threshold,
            );
        }

        Ok(doc_id)
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let Some(doc_id) = self.documents.doc_id(id) else {
            return false;
        };
        self.index.delete_document(doc_id);
        self.facets.remove_document(doc_id);
        self.documents.delete(id);
        true
    }

    pub fn all_doc_ids(&self) -> HashSet<DocId> {
        self.documents.all_doc_ids()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.index.clear();
        self.facets = FacetIndex::new();
        self.mappings = MappingManager::new();
        self.term_doc_frequencies.clear();
    }
}

fn is_token_indexed(field_type: FieldType) -> bool {
    !matches!(
        field_type,
        FieldType::Boolean
            | FieldType::Date
            | FieldType::Integer
            | FieldType::Long
            | FieldType::Short
            | FieldType::Byte
            | FieldType::Float
            | FieldType::Double
            | FieldType::Number
            | FieldType::GeoPoint
            | FieldType::Object
    )
}

/// Keyword fields still get the standard analyzer for text-searchability, by
/// design — the engine facade's `add` pipeline rule.
fn default_analyzer_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Email => "email",
        FieldType::Url => "url",
        FieldType::Phone => "phone",
        _ => "standard",
    }
}

/// A named index's handle, usable concurrently by many readers and
/// serialized for writers via the inner `RwLock`.
pub struct NamedIndex {
    pub state: RwLock<IndexState>,
}

impl NamedIndex {
    pub fn new(settings: IndexSettings) -> Self {
        NamedIndex {
            state: RwLock::new(IndexState::new(settings)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, title: &str) -> Document {
        Document::from_json(json!({"id": id, "title": title}), "idx").unwrap()
    }

    #[test]
    fn add_then_search_all_contains_doc() {
        let mut state = IndexState::new(IndexSettings::default());
        state.add(doc("d1", "Rust search engine design")).unwrap();
        assert!(state.all_doc_ids().len() == 1);
        assert!(state.documents.exists("d1"));
    }

    #[test]
    fn re_adding_same_id_replaces_instead_of_duplicating() {
        let mut state = IndexState::new(IndexSettings::default());
        state.add(doc("d1", "first version")).unwrap();
        state.add(doc("d1", "second version")).unwrap();
        assert_eq!(state.documents.count(), 1);
    }

    #[test]
    fn delete_removes_all_postings() {
        let mut state = IndexState::new(IndexSettings::default());
        state.add(doc("d1", "unique wordage")).unwrap();
        let doc_id = state.documents.doc_id("d1").unwrap();
        state.delete("d1");
        let key = crate::index::composite_key("title", "wordage");
        assert_eq!(state.index.term_frequency(&key, doc_id), 0);
        assert_eq!(state.documents.count(), 0);
    }

    #[test]
    fn missing_id_is_rejected() {
        let mut state = IndexState::new(IndexSettings::default());
        let result = state.add(Document::new("", "idx"));
        assert!(result.is_err());
    }
}

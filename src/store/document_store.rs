use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::types::{DocId, Document};

/// Document storage keyed by external string id, with a dense `DocId`
/// assigned on first insert and a parallel token-length table BM25 reads for
/// field-length normalization. Built fresh (no direct teacher counterpart —
/// the teacher's document storage lives inside its MVCC/segment machinery),
/// in the flat `HashMap`-plus-counters idiom the teacher uses elsewhere
/// (e.g. `core::stats::DatabaseStats`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStore {
    documents: HashMap<String, Document>,
    doc_ids: HashMap<String, DocId>,
    id_by_doc: HashMap<DocId, String>,
    doc_lengths: HashMap<DocId, u32>,
    next_doc_id: u32,
}

impl DocumentStore {
    pub fn new() -> Self {
        DocumentStore::default()
    }

    /// Assigns a fresh `DocId` on first insert; re-inserting an existing id
    /// reuses its `DocId` and overwrites the stored document.
    pub fn put(&mut self, doc: Document, token_length: u32) -> DocId {
        let doc_id = match self.doc_ids.get(&doc.id) {
            Some(id) => *id,
            None => {
                let id = DocId(self.next_doc_id);
                self.next_doc_id += 1;
                self.doc_ids.insert(doc.id.clone(), id);
                self.id_by_doc.insert(id, doc.id.clone());
                id
            }
        };
        self.doc_lengths.insert(doc_id, token_length);
        self.documents.insert(doc.id.clone(), doc);
        doc_id
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn doc_id(&self, id: &str) -> Option<DocId> {
        self.doc_ids.get(id).copied()
    }

    pub fn doc_length(&self, doc_id: DocId) -> u32 {
        self.doc_lengths.get(&doc_id).copied().unwrap_or(0)
    }

    pub fn delete(&mut self, id: &str) -> Option<DocId> {
        self.documents.remove(id);
        let doc_id = self.doc_ids.remove(id);
        if let Some(doc_id) = doc_id {
            self.doc_lengths.remove(&doc_id);
            self.id_by_doc.remove(&doc_id);
        }
        doc_id
    }

    pub fn exists(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    pub fn all_doc_ids(&self) -> HashSet<DocId> {
        self.doc_ids.values().copied().collect()
    }

    pub fn get_by_doc_id(&self, doc_id: DocId) -> Option<&Document> {
        self.id_by_doc
            .get(&doc_id)
            .and_then(|external_id| self.documents.get(external_id))
    }

    pub fn count(&self) -> usize {
        self.documents.len()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.doc_ids.clear();
        self.id_by_doc.clear();
        self.doc_lengths.clear();
        self.next_doc_id = 0;
    }

    pub fn average_doc_length(&self) -> f32 {
        if self.doc_lengths.is_empty() {
            return 0.0;
        }
        let total: u64 = self.doc_lengths.values().map(|&l| l as u64).sum();
        total as f32 / self.doc_lengths.len() as f32
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Document)> {
        self.documents.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> Document {
        Document::new(id, "idx")
    }

    #[test]
    fn put_assigns_stable_doc_id_on_update() {
        let mut store = DocumentStore::new();
        let a = store.put(doc("doc-1"), 10);
        let b = store.put(doc("doc-1"), 20);
        assert_eq!(a, b);
        assert_eq!(store.doc_length(a), 20);
    }

    #[test]
    fn delete_removes_document_and_length() {
        let mut store = DocumentStore::new();
        let id = store.put(doc("doc-1"), 5);
        assert!(store.exists("doc-1"));
        store.delete("doc-1");
        assert!(!store.exists("doc-1"));
        assert_eq!(store.doc_length(id), 0);
    }

    #[test]
    fn average_doc_length_ignores_empty_store() {
        let store = DocumentStore::new();
        assert_eq!(store.average_doc_length(), 0.0);
    }
}

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::config::IndexSettings;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Document};
use crate::facet::FacetIndex;
use crate::index::InvertedIndex;
use crate::schema::MappingManager;
use crate::store::DocumentStore;

/// One document's occurrences for a single `field:term` key, keyed by
/// external document id so the snapshot stays engine-agnostic (the internal
/// dense `DocId` is reassigned on load).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingRecord {
    pub frequency: u32,
    pub positions: Vec<u32>,
}

/// The engine-agnostic snapshot contract from the persistence boundary:
/// documents, lengths, corpus stats, mappings, and the full posting
/// structure, addressed by external string ids throughout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub documents: BTreeMap<String, Document>,
    pub doc_lengths: BTreeMap<String, u32>,
    pub total_docs: usize,
    pub avg_doc_length: f32,
    pub mappings: MappingManager,
    pub inverted_index: BTreeMap<String, BTreeMap<String, PostingRecord>>,
    pub facet_fields: Vec<String>,
    pub index_name: String,
}

impl Snapshot {
    pub fn build(
        index_name: &str,
        documents: &DocumentStore,
        index: &InvertedIndex,
        mappings: &MappingManager,
        facet_fields: &[String],
    ) -> Self {
        let mut out_documents = BTreeMap::new();
        let mut doc_lengths = BTreeMap::new();
        for (id, doc) in documents.iter() {
            out_documents.insert(id.clone(), doc.clone());
            if let Some(doc_id) = documents.doc_id(id) {
                doc_lengths.insert(id.clone(), documents.doc_length(doc_id));
            }
        }

        let mut inverted_index = BTreeMap::new();
        for key in index.get_all_tokens() {
            let postings = index.get_posting(&key);
            let mut by_doc = BTreeMap::new();
            for posting in postings.iter() {
                if let Some(doc) = documents.get_by_doc_id(posting.doc_id) {
                    by_doc.insert(
                        doc.id.clone(),
                        PostingRecord {
                            frequency: posting.term_freq,
                            positions: posting.positions(),
                        },
                    );
                }
            }
            inverted_index.insert(key, by_doc);
        }

        Snapshot {
            documents: out_documents,
            doc_lengths,
            total_docs: documents.count(),
            avg_doc_length: documents.average_doc_length(),
            mappings: mappings.clone(),
            inverted_index,
            facet_fields: facet_fields.to_vec(),
            index_name: index_name.to_string(),
        }
    }

    /// Reconstructs shard assignments from docIds and rebuilds facet indexes
    /// from the restored documents, as the persistence contract requires.
    pub fn restore(&self, settings: &IndexSettings) -> (DocumentStore, InvertedIndex, MappingManager, FacetIndex) {
        let mut documents = DocumentStore::new();
        let mut doc_id_by_external: BTreeMap<String, DocId> = BTreeMap::new();
        for (id, doc) in &self.documents {
            let length = self.doc_lengths.get(id).copied().unwrap_or(0);
            let doc_id = documents.put(doc.clone(), length);
            doc_id_by_external.insert(id.clone(), doc_id);
        }

        let mut index = InvertedIndex::new(settings.effective_num_shards(), settings.position_compression_threshold);
        for (key, by_doc) in &self.inverted_index {
            let Some((field, _term)) = key.split_once(':') else {
                continue;
            };
            let _ = field;
            for (external_id, record) in by_doc {
                let Some(&doc_id) = doc_id_by_external.get(external_id) else {
                    continue;
                };
                for &position in &record.positions {
                    let (field, term) = key.split_once(':').unwrap();
                    index.add_token(field, term, doc_id, position);
                }
            }
        }

        let mut facets = FacetIndex::new();
        for (external_id, doc) in &self.documents {
            let Some(&doc_id) = doc_id_by_external.get(external_id) else {
                continue;
            };
            for field in &self.facet_fields {
                if let Some(value) = doc.get_field(field) {
                    facets.index_field(doc_id, field, value);
                }
            }
        }

        (documents, index, self.mappings.clone(), facets)
    }
}

/// Tagged append-log record, appended in commit order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AppendRecord {
    Add { doc: Document },
    Delete { doc_id: String },
}

/// Persistence boundary: snapshot plus append-log collaborator, kept
/// abstract so the engine never depends on a concrete storage backend.
pub trait PersistenceSink {
    fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()>;
    fn read_snapshot(&self) -> Result<Option<Snapshot>>;
    fn append(&self, record: &AppendRecord) -> Result<()>;
    fn read_append_log(&self) -> Result<Vec<AppendRecord>>;
    /// Truncates just the append log, leaving any written snapshot in place.
    fn clear_append_log(&self) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// File-based `PersistenceSink`: a `serde_json` snapshot file plus a
/// newline-delimited-JSON append log, each record's checksum validated with
/// `crc32fast` on read. Not a WAL/segment/MVCC system — a thin boundary
/// implementation matching §6's engine-agnostic contract, nothing more.
pub struct FileSnapshotSink {
    snapshot_path: PathBuf,
    append_log_path: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct AppendLine {
    checksum: u32,
    record: AppendRecord,
}

impl FileSnapshotSink {
    pub fn new(dir: impl AsRef<Path>, index_name: &str) -> Self {
        let dir = dir.as_ref();
        FileSnapshotSink {
            snapshot_path: dir.join(format!("{index_name}.snapshot.json")),
            append_log_path: dir.join(format!("{index_name}.append.log")),
        }
    }
}

impl PersistenceSink for FileSnapshotSink {
    fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.snapshot_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(snapshot)?;
        fs::write(&self.snapshot_path, json)?;
        Ok(())
    }

    fn read_snapshot(&self) -> Result<Option<Snapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.snapshot_path)?;
        let snapshot = serde_json::from_slice(&bytes)?;
        Ok(Some(snapshot))
    }

    fn append(&self, record: &AppendRecord) -> Result<()> {
        if let Some(parent) = self.append_log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let record_bytes = serde_json::to_vec(record)?;
        let checksum = crc32fast::hash(&record_bytes);
        let line = AppendLine {
            checksum,
            record: record.clone(),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.append_log_path)?;
        let mut line_bytes = serde_json::to_vec(&line)?;
        line_bytes.push(b'\n');
        file.write_all(&line_bytes)?;
        Ok(())
    }

    /// Skips (rather than fails on) a truncated or corrupted trailing
    /// record — no replay/recovery subsystem is in scope, just detection.
    fn read_append_log(&self) -> Result<Vec<AppendRecord>> {
        if !self.append_log_path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.append_log_path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let Ok(parsed) = serde_json::from_str::<AppendLine>(&line) else {
                continue;
            };
            let record_bytes = serde_json::to_vec(&parsed.record).map_err(Error::from)?;
            if crc32fast::hash(&record_bytes) != parsed.checksum {
                continue;
            }
            records.push(parsed.record);
        }
        Ok(records)
    }

    fn clear_append_log(&self) -> Result<()> {
        if self.append_log_path.exists() {
            fs::remove_file(&self.append_log_path)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.snapshot_path.exists() {
            fs::remove_file(&self.snapshot_path)?;
        }
        self.clear_append_log()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Analyzer, AnalyzerKind, StopwordSet};
    use crate::schema::FieldType;

    fn build_sample() -> (DocumentStore, InvertedIndex, MappingManager) {
        let mut documents = DocumentStore::new();
        let mut index = InvertedIndex::new(2, 256);
        let mut mappings = MappingManager::new();
        mappings.set("body", FieldType::Text);

        let doc = Document::new("doc-1", "idx");
        let doc_id = documents.put(doc, 2);
        let analyzer = Analyzer::new(AnalyzerKind::Standard);
        for token in analyzer.tokenize("rust search", &StopwordSet::new()) {
            index.add_token("body", &token.text, doc_id, token.position);
        }
        (documents, index, mappings)
    }

    #[test]
    fn build_and_restore_round_trips_postings() {
        let (documents, index, mappings) = build_sample();
        let snapshot = Snapshot::build("idx", &documents, &index, &mappings, &[]);
        let settings = IndexSettings::default();
        let (restored_docs, restored_index, _mappings, _facets) = snapshot.restore(&settings);

        assert_eq!(restored_docs.count(), 1);
        let restored_id = restored_docs.doc_id("doc-1").unwrap();
        let key = crate::index::composite_key("body", "rust");
        assert_eq!(restored_index.term_frequency(&key, restored_id), 1);
    }

    #[test]
    fn file_sink_round_trips_snapshot_and_log() {
        let (documents, index, mappings) = build_sample();
        let snapshot = Snapshot::build("idx", &documents, &index, &mappings, &[]);
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSnapshotSink::new(dir.path(), "idx");

        sink.write_snapshot(&snapshot).unwrap();
        let loaded = sink.read_snapshot().unwrap().unwrap();
        assert_eq!(loaded.total_docs, 1);

        sink.append(&AppendRecord::Add { doc: Document::new("doc-2", "idx") }).unwrap();
        sink.append(&AppendRecord::Delete { doc_id: "doc-2".to_string() }).unwrap();
        let records = sink.read_append_log().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn read_append_log_skips_corrupted_trailing_line() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSnapshotSink::new(dir.path(), "idx");
        sink.append(&AppendRecord::Delete { doc_id: "x".to_string() }).unwrap();
        let mut path = dir.path().to_path_buf();
        path.push("idx.append.log");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{not valid json\n").unwrap();
        let records = sink.read_append_log().unwrap();
        assert_eq!(records.len(), 1);
    }
}

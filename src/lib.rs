pub mod analysis;
pub mod compression;
pub mod core;
pub mod engine;
pub mod facet;
pub mod index;
pub mod query;
pub mod schema;
pub mod scoring;
pub mod search;
pub mod store;

pub use core::config::IndexSettings;
pub use core::error::{Error, ErrorKind, Result};
pub use core::types::{DocId, Document, FieldValue};
pub use engine::{SearchEngine, SearchHit, SearchQuery, SearchRequest, SearchResponse};
pub use query::ast::Query;

/*
┌────────────────────────────────────────────────────────────────────────────────────────────┐
│                              EMBEDDED SEARCH ENGINE LAYOUT                                   │
└────────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── ENGINE LAYER ───────────────────────────────────────────┐
│                                                                                              │
│  struct SearchEngine                          struct NamedIndex                             │
│  • indices: RwLock<HashMap<String, Arc<NamedIndex>>>   • state: RwLock<IndexState>           │
│  • persistence_dir: Option<PathBuf>                                                          │
│  • shut_down: AtomicBool                                                                     │
│                                                                                              │
│  struct IndexState                            trait PersistenceSink                         │
│  • settings: IndexSettings                    • write_snapshot() / read_snapshot()           │
│  • documents: DocumentStore                   • append() / read_append_log()                │
│  • index: InvertedIndex                       • clear()                                      │
│  • mappings: MappingManager                                                                  │
│  • facets: FacetIndex                         struct FileSnapshotSink                        │
│  • stopwords / synonyms / analyzers           struct Snapshot (engine-agnostic, by doc id)   │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────── ANALYSIS LAYER ───────────────────────────────────────────┐
│  struct Analyzer { kind: AnalyzerKind, pattern: Arc<Regex> }                                 │
│  enum AnalyzerKind { Standard, Simple, Whitespace, Keyword, Email, Url, Phone,               │
│                      Pattern, Advanced }                                                     │
│  struct AnalyzerRegistry (name -> Analyzer)                                                  │
│  struct StopwordSet (static + auto-detected)      struct SynonymMap                          │
│  struct Token { text, position, offset }                                                     │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── SCHEMA LAYER ────────────────────────────────────────────┐
│  enum FieldType (Text/Keyword/Email/Url/Phone/Date/Boolean/Integer/Long/Short/Byte/Float/    │
│                  Double/Number/GeoPoint/Object)                                              │
│  struct FieldMapping { name, field_type, analyzer }                                          │
│  struct MappingManager (auto_map / validate)                                                 │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── INDEX LAYER ─────────────────────────────────────────────┐
│  struct InvertedIndex { shards: Vec<HashMap<String, PostingList>>, ... }                     │
│  struct PostingList { postings: Vec<Posting> }                                               │
│  struct Posting { doc_id, term_freq, positions: Inline(Vec<u32>) | Compressed(Vec<u8>) }     │
│  mod compression::{delta, vbyte}                                                             │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── STORE / FACET LAYER ────────────────────────────────────┐
│  struct DocumentStore (id <-> DocId, doc lengths)                                            │
│  struct FacetIndex (bucket -> value -> doc ids)                                              │
│  enum Aggregation (Terms/Histogram/DateHistogram/Range/Nested/Global/Filter)                  │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── QUERY / SCORE LAYER ────────────────────────────────────┐
│  enum Query (MatchAll/Match/Term/Range/Prefix/Wildcard/Fuzzy/Phrase/MatchPhrase/             │
│              GeoDistance/Exists/Bool)                                                        │
│  fn execute(query, ExecutionContext) -> HashSet<DocId>                                       │
│  trait Scorer                               struct BM25Scorer                                │
│  fn rank / fn paginate / fn extract_query_tokens                                             │
└──────────────────────────────────────────────────────────────────────────────────────────────┘
*/

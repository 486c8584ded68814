pub mod facade;
pub mod index_handle;
pub mod snapshot;

pub use facade::{IndexStats, SearchEngine, SearchHit, SearchQuery, SearchRequest, SearchResponse};
pub use index_handle::{IndexState, NamedIndex};
pub use snapshot::{AppendRecord, FileSnapshotSink, PersistenceSink, Snapshot};

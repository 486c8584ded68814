pub mod bm25;

pub use bm25::{BM25Scorer, DocStats, Scorer};

pub mod ranking;

pub use ranking::{extract_query_tokens, paginate, rank, ScoredDocument};

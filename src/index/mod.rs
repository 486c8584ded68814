pub mod inverted;
pub mod posting;

pub use inverted::{composite_key, InvertedIndex};
pub use posting::{Posting, PostingList};

pub mod aggregation;
pub mod facet_index;

pub use aggregation::{Aggregation, AggregationResult, DateInterval, FieldLookup};
pub use facet_index::FacetIndex;

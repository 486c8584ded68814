pub mod mapping;

pub use mapping::{FieldMapping, FieldType, MappingManager};

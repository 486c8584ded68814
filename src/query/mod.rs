pub mod ast;
pub mod executor;

pub use ast::*;
pub use executor::{execute, ExecutionContext};

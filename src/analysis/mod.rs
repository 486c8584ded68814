pub mod analyzer;
pub mod stopwords;
pub mod synonyms;
pub mod token;
pub mod tokenizer;

pub use analyzer::{Analyzer, AnalyzerKind, AnalyzerRegistry};
pub use stopwords::StopwordSet;
pub use synonyms::SynonymMap;
pub use token::Token;

use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::analysis::stopwords::StopwordSet;
use crate::analysis::token::{number_tokens, Token};
use crate::analysis::tokenizer::{
    default_pattern, tokenize_advanced, tokenize_email, tokenize_keyword, tokenize_pattern,
    tokenize_phone, tokenize_simple, tokenize_standard, tokenize_url, tokenize_whitespace,
};

/// The nine analyzer modes this engine understands. Unknown names fall back
/// to `Standard` (see `AnalyzerKind::parse`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerKind {
    Standard,
    Simple,
    Whitespace,
    Keyword,
    Email,
    Url,
    Phone,
    Pattern,
    Advanced,
}

impl AnalyzerKind {
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "standard" => AnalyzerKind::Standard,
            "simple" => AnalyzerKind::Simple,
            "whitespace" => AnalyzerKind::Whitespace,
            "keyword" => AnalyzerKind::Keyword,
            "email" => AnalyzerKind::Email,
            "url" => AnalyzerKind::Url,
            "phone" => AnalyzerKind::Phone,
            "pattern" => AnalyzerKind::Pattern,
            "advanced" => AnalyzerKind::Advanced,
            _ => AnalyzerKind::Standard,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnalyzerKind::Standard => "standard",
            AnalyzerKind::Simple => "simple",
            AnalyzerKind::Whitespace => "whitespace",
            AnalyzerKind::Keyword => "keyword",
            AnalyzerKind::Email => "email",
            AnalyzerKind::Url => "url",
            AnalyzerKind::Phone => "phone",
            AnalyzerKind::Pattern => "pattern",
            AnalyzerKind::Advanced => "advanced",
        }
    }

    /// Whether stopwords are dropped after tokenization for this mode.
    fn filters_stopwords(&self) -> bool {
        matches!(
            self,
            AnalyzerKind::Standard | AnalyzerKind::Simple | AnalyzerKind::Advanced
        )
    }
}

/// Text analysis pipeline: a tokenizer mode plus an optional configured
/// pattern regex, producing positioned tokens from raw text.
#[derive(Clone)]
pub struct Analyzer {
    pub kind: AnalyzerKind,
    pattern: Arc<Regex>,
}

impl Analyzer {
    pub fn new(kind: AnalyzerKind) -> Self {
        Analyzer {
            kind,
            pattern: Arc::new(default_pattern()),
        }
    }

    pub fn with_pattern(pattern: Regex) -> Self {
        Analyzer {
            kind: AnalyzerKind::Pattern,
            pattern: Arc::new(pattern),
        }
    }

    pub fn from_name(name: &str) -> Self {
        Analyzer::new(AnalyzerKind::parse(name))
    }

    /// Returns an empty sequence for empty input; unknown analyzer names
    /// fall back to `standard` at construction time via `from_name`.
    pub fn tokenize(&self, text: &str, stopwords: &StopwordSet) -> Vec<Token> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut terms = match self.kind {
            AnalyzerKind::Standard => tokenize_standard(text),
            AnalyzerKind::Simple => tokenize_simple(text),
            AnalyzerKind::Whitespace => tokenize_whitespace(text),
            AnalyzerKind::Keyword => tokenize_keyword(text),
            AnalyzerKind::Email => tokenize_email(text),
            AnalyzerKind::Url => tokenize_url(text),
            AnalyzerKind::Phone => tokenize_phone(text),
            AnalyzerKind::Pattern => tokenize_pattern(text, &self.pattern),
            AnalyzerKind::Advanced => tokenize_advanced(text),
        };

        if self.kind.filters_stopwords() {
            terms = stopwords.filter(terms);
        }

        number_tokens(terms)
    }
}

/// Registry of named analyzers, used when a field mapping overrides the
/// analyzer chosen by field type (see `MappingManager`).
#[derive(Clone)]
pub struct AnalyzerRegistry {
    analyzers: HashMap<String, Analyzer>,
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        let mut registry = AnalyzerRegistry {
            analyzers: HashMap::new(),
        };
        for kind in [
            AnalyzerKind::Standard,
            AnalyzerKind::Simple,
            AnalyzerKind::Whitespace,
            AnalyzerKind::Keyword,
            AnalyzerKind::Email,
            AnalyzerKind::Url,
            AnalyzerKind::Phone,
            AnalyzerKind::Pattern,
            AnalyzerKind::Advanced,
        ] {
            registry
                .analyzers
                .insert(kind.name().to_string(), Analyzer::new(kind));
        }
        registry
    }
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, analyzer: Analyzer) {
        self.analyzers.insert(name.to_string(), analyzer);
    }

    /// Unknown names fall back to the `standard` analyzer.
    pub fn get(&self, name: &str) -> Analyzer {
        self.analyzers
            .get(name)
            .cloned()
            .unwrap_or_else(|| Analyzer::new(AnalyzerKind::Standard))
    }
}

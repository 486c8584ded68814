use serde::{Deserialize, Serialize};

/// A single emitted token: normalized text plus its sequential position
/// within the field invocation that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub position: u32,
}

impl Token {
    pub fn new(text: impl Into<String>, position: u32) -> Self {
        Token {
            text: text.into(),
            position,
        }
    }
}

/// Number the given terms sequentially, starting at 0.
pub fn number_tokens(terms: Vec<String>) -> Vec<Token> {
    terms
        .into_iter()
        .enumerate()
        .map(|(i, text)| Token::new(text, i as u32))
        .collect()
}

use std::collections::{HashMap, HashSet};

/// Lowercase term -> set of lowercase synonym terms, consumed at query time
/// for text-term expansion. Symmetry is not required; lookups are exact.
#[derive(Debug, Clone, Default)]
pub struct SynonymMap {
    entries: HashMap<String, HashSet<String>>,
}

impl SynonymMap {
    pub fn new() -> Self {
        SynonymMap::default()
    }

    pub fn insert(&mut self, term: &str, synonym: &str) {
        self.entries
            .entry(term.to_lowercase())
            .or_default()
            .insert(synonym.to_lowercase());
    }

    pub fn insert_many(&mut self, term: &str, synonyms: impl IntoIterator<Item = impl Into<String>>) {
        for syn in synonyms {
            self.insert(term, &syn.into());
        }
    }

    /// Absence returns the empty set (no expansion).
    pub fn get(&self, term: &str) -> HashSet<String> {
        self.entries
            .get(&term.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_term_expands_to_empty() {
        let map = SynonymMap::new();
        assert!(map.get("rust").is_empty());
    }

    #[test]
    fn lookup_is_case_insensitive_on_key() {
        let mut map = SynonymMap::new();
        map.insert("Car", "automobile");
        assert_eq!(map.get("car"), map.get("CAR"));
        assert!(map.get("car").contains("automobile"));
    }
}

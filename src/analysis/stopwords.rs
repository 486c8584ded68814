use std::collections::HashMap;
use std::collections::HashSet;

/// A case-insensitive set of terms excluded from indexing and querying by
/// the `standard`/`simple`/`advanced` analyzers.
#[derive(Debug, Clone, Default)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl StopwordSet {
    pub fn new() -> Self {
        StopwordSet::default()
    }

    pub fn english() -> Self {
        let words = [
            "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in",
            "is", "it", "its", "of", "on", "that", "the", "to", "was", "will", "with",
        ];
        StopwordSet {
            words: words.iter().map(|w| w.to_string()).collect(),
        }
    }

    pub fn contains(&self, term: &str) -> bool {
        self.words.contains(&term.to_lowercase())
    }

    pub fn add(&mut self, term: &str) {
        self.words.insert(term.to_lowercase());
    }

    pub fn remove(&mut self, term: &str) {
        self.words.remove(&term.to_lowercase());
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Add every term whose observed document frequency meets `threshold`
    /// (a ratio of documents containing the term over `total_docs`).
    pub fn auto_detect(&mut self, term_doc_frequencies: &HashMap<String, usize>, total_docs: usize, threshold: f64) {
        if total_docs == 0 {
            return;
        }
        for (term, df) in term_doc_frequencies {
            let ratio = *df as f64 / total_docs as f64;
            if ratio >= threshold {
                self.add(term);
            }
        }
    }

    pub fn filter(&self, terms: Vec<String>) -> Vec<String> {
        terms.into_iter().filter(|t| !self.contains(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_contains() {
        let mut set = StopwordSet::new();
        set.add("The");
        assert!(set.contains("the"));
        assert!(set.contains("THE"));
    }

    #[test]
    fn auto_detect_respects_threshold() {
        let mut set = StopwordSet::new();
        let mut freqs = HashMap::new();
        freqs.insert("common".to_string(), 9);
        freqs.insert("rare".to_string(), 1);
        set.auto_detect(&freqs, 10, 0.5);
        assert!(set.contains("common"));
        assert!(!set.contains("rare"));
    }
}

use crate::core::config::ScorerConfig;

/// Capability interface decoupling the query executor from the concrete
/// scorer, kept from the teacher's `scoring::scorer::Scorer` trait — a query
/// executor generic over `S: Scorer` costs nothing and mirrors the teacher's
/// own `QueryExecutor::calculate_score<S: Scorer>` shape.
pub trait Scorer: Send + Sync {
    fn score(&self, field: &str, term_freq: u32, doc_id_stats: DocStats) -> f32;
}

/// Per-document/per-term inputs a scorer needs: document frequency and
/// total corpus size feed the IDF term, the rest feed length normalization.
#[derive(Debug, Clone, Copy)]
pub struct DocStats {
    pub doc_freq: usize,
    pub total_docs: usize,
    pub doc_length: u32,
    pub avg_doc_length: f32,
}

/// BM25 with the smoothed Robertson/Sparck-Jones IDF term, diverging from
/// the teacher's unsmoothed `ln((N+1)/(df+1))` (see DESIGN.md).
#[derive(Debug, Clone)]
pub struct BM25Scorer {
    config: ScorerConfig,
}

impl BM25Scorer {
    pub fn new(config: ScorerConfig) -> Self {
        BM25Scorer { config }
    }

    pub fn idf(doc_freq: usize, total_docs: usize) -> f32 {
        if doc_freq == 0 {
            return 0.0;
        }
        let n = total_docs as f32;
        let df = doc_freq as f32;
        (((n - df + 0.5) / (df + 0.5)) + 1.0).ln()
    }
}

impl Scorer for BM25Scorer {
    fn score(&self, field: &str, term_freq: u32, stats: DocStats) -> f32 {
        if stats.doc_freq == 0 {
            return 0.0;
        }
        let idf = Self::idf(stats.doc_freq, stats.total_docs);
        let tf = term_freq as f32;
        let avgdl = stats.avg_doc_length.max(1.0);
        let dl = stats.doc_length as f32;
        let k1 = self.config.k1;
        let b = self.config.b;

        let numerator = idf * tf * (k1 + 1.0);
        let denominator = tf + k1 * (1.0 - b + b * (dl / avgdl));
        let score = self.config.boost(field) * numerator / denominator;
        score.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_term_scores_zero() {
        let scorer = BM25Scorer::new(ScorerConfig::default());
        let stats = DocStats {
            doc_freq: 0,
            total_docs: 100,
            doc_length: 50,
            avg_doc_length: 40.0,
        };
        assert_eq!(scorer.score("body", 3, stats), 0.0);
    }

    #[test]
    fn score_is_never_negative() {
        let scorer = BM25Scorer::new(ScorerConfig::default());
        let stats = DocStats {
            doc_freq: 99,
            total_docs: 100,
            doc_length: 50,
            avg_doc_length: 40.0,
        };
        assert!(scorer.score("body", 1, stats) >= 0.0);
    }

    #[test]
    fn field_boost_scales_score() {
        let mut config = ScorerConfig::default();
        config.field_boosts.insert("title".to_string(), 2.0);
        let scorer = BM25Scorer::new(config);
        let stats = DocStats {
            doc_freq: 10,
            total_docs: 100,
            doc_length: 50,
            avg_doc_length: 40.0,
        };
        let boosted = scorer.score("title", 3, stats);
        let plain = scorer.score("body", 3, stats);
        assert!((boosted - plain * 2.0).abs() < 1e-4);
    }

    #[test]
    fn higher_term_frequency_increases_score() {
        let scorer = BM25Scorer::new(ScorerConfig::default());
        let stats = DocStats {
            doc_freq: 10,
            total_docs: 100,
            doc_length: 50,
            avg_doc_length: 40.0,
        };
        assert!(scorer.score("body", 5, stats) > scorer.score("body", 1, stats));
    }
}

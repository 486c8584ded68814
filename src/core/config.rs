use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::error::{Error, Result};

/// BM25 parameters plus optional per-field boosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    pub k1: f32,
    pub b: f32,
    pub field_boosts: HashMap<String, f32>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        ScorerConfig {
            k1: 1.2,
            b: 0.75,
            field_boosts: HashMap::new(),
        }
    }
}

impl ScorerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k1 < 0.0 {
            return Err(Error::config(format!("k1 must be >= 0, got {}", self.k1)));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(Error::config(format!("b must be in [0,1], got {}", self.b)));
        }
        Ok(())
    }

    pub fn boost(&self, field: &str) -> f32 {
        self.field_boosts.get(field).copied().unwrap_or(1.0)
    }
}

/// Stopword auto-detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopwordConfig {
    /// Document-frequency ratio above which a term is auto-added as a stopword.
    pub threshold: f64,
    pub auto_save: bool,
}

impl Default for StopwordConfig {
    fn default() -> Self {
        StopwordConfig {
            threshold: 0.9,
            auto_save: false,
        }
    }
}

/// Per-index configuration, as accepted by `SearchEngine::create_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    pub index_name: String,
    pub enable_sharded_storage: bool,
    pub num_shards: usize,
    pub facet_fields: Vec<String>,
    pub aggregation_fields: Vec<String>,
    pub scorer: ScorerConfig,
    pub auto_map: bool,
    pub auto_extend: bool,
    pub stopwords: StopwordConfig,
    /// Position lists longer than this are delta-encoded at rest.
    pub position_compression_threshold: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        IndexSettings {
            index_name: "default".to_string(),
            enable_sharded_storage: true,
            num_shards: 8,
            facet_fields: Vec::new(),
            aggregation_fields: Vec::new(),
            scorer: ScorerConfig::default(),
            auto_map: true,
            auto_extend: true,
            stopwords: StopwordConfig::default(),
            position_compression_threshold: 256,
        }
    }
}

impl IndexSettings {
    pub fn validate(&self) -> Result<()> {
        if self.num_shards < 1 {
            return Err(Error::config("num_shards must be >= 1"));
        }
        self.scorer.validate()?;
        if !(0.0..=1.0).contains(&self.stopwords.threshold) {
            return Err(Error::config("stopwords.threshold must be in [0,1]"));
        }
        Ok(())
    }

    pub fn effective_num_shards(&self) -> usize {
        if self.enable_sharded_storage {
            self.num_shards.max(1)
        } else {
            1
        }
    }
}

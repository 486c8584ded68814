use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::hash::shard_of;
use crate::core::types::DocId;
use crate::index::posting::PostingList;

/// `field:term` composite key, as required by the indexing contract.
pub fn composite_key(field: &str, term: &str) -> String {
    format!("{field}:{term}")
}

/// Sharded inverted index: `N` independent term maps, each owning the
/// postings for the documents that hash into it. Generalized from the
/// teacher's single flat `HashMap<Term, PostingList>` to `Vec<HashMap<..>>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvertedIndex {
    shards: Vec<HashMap<String, PostingList>>,
    position_compression_threshold: usize,
    last_rebalance: Option<DateTime<Utc>>,
}

impl InvertedIndex {
    pub fn new(num_shards: usize, position_compression_threshold: usize) -> Self {
        let num_shards = num_shards.max(1);
        InvertedIndex {
            shards: (0..num_shards).map(|_| HashMap::new()).collect(),
            position_compression_threshold,
            last_rebalance: None,
        }
    }

    fn shard_index(&self, doc_id: DocId) -> usize {
        shard_of(&doc_id.value().to_string(), self.shards.len())
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Updates frequency and inserts the position if not already present, or
    /// leaves state unchanged — never a partial write.
    pub fn add_token(&mut self, field: &str, term: &str, doc_id: DocId, position: u32) {
        let key = composite_key(field, term);
        let shard = self.shard_index(doc_id);
        self.shards[shard]
            .entry(key)
            .or_default()
            .add(doc_id, position, self.position_compression_threshold);
    }

    /// Fans out across every shard and merges matching postings for `key`.
    pub fn get_posting(&self, key: &str) -> PostingList {
        let mut merged = PostingList::new();
        for shard in &self.shards {
            if let Some(list) = shard.get(key) {
                for posting in list.iter() {
                    for position in posting.positions() {
                        merged.add(posting.doc_id, position, self.position_compression_threshold);
                    }
                }
            }
        }
        merged
    }

    pub fn get_positions(&self, key: &str, doc_id: DocId) -> Vec<u32> {
        let shard = self.shard_index(doc_id);
        self.shards[shard]
            .get(key)
            .map(|list| list.positions(doc_id))
            .unwrap_or_default()
    }

    pub fn term_frequency(&self, key: &str, doc_id: DocId) -> u32 {
        let shard = self.shard_index(doc_id);
        self.shards[shard]
            .get(key)
            .map(|list| list.term_freq(doc_id))
            .unwrap_or(0)
    }

    /// Document frequency: number of distinct documents carrying `key`,
    /// summed across shards.
    pub fn doc_freq(&self, key: &str) -> usize {
        self.shards
            .iter()
            .filter_map(|shard| shard.get(key))
            .map(|list| list.doc_freq())
            .sum()
    }

    pub fn delete_document(&mut self, doc_id: DocId) {
        let shard = self.shard_index(doc_id);
        self.shards[shard].retain(|_, list| {
            list.remove(doc_id);
            !list.is_empty()
        });
    }

    pub fn clear(&mut self) {
        for shard in &mut self.shards {
            shard.clear();
        }
        self.last_rebalance = None;
    }

    pub fn get_all_tokens(&self) -> HashSet<String> {
        self.shards
            .iter()
            .flat_map(|shard| shard.keys().cloned())
            .collect()
    }

    pub fn get_field_tokens(&self, field: &str) -> HashSet<String> {
        let prefix = format!("{field}:");
        self.get_all_tokens()
            .into_iter()
            .filter(|k| k.starts_with(&prefix))
            .collect()
    }

    /// Redistributes every key round-robin across shards. Built fresh as a
    /// whole-index swap so no reader ever observes a partially-moved shard.
    pub fn rebalance(&mut self, now: DateTime<Utc>) {
        let num_shards = self.shards.len();
        if num_shards <= 1 {
            self.last_rebalance = Some(now);
            return;
        }
        let mut all_entries: Vec<(String, PostingList)> = self
            .shards
            .iter_mut()
            .flat_map(|shard| shard.drain())
            .collect();
        all_entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut new_shards: Vec<HashMap<String, PostingList>> =
            (0..num_shards).map(|_| HashMap::new()).collect();
        for (i, (key, list)) in all_entries.into_iter().enumerate() {
            new_shards[i % num_shards].insert(key, list);
        }
        self.shards = new_shards;
        self.last_rebalance = Some(now);
    }

    /// True when the largest shard (by key count) is more than twice the
    /// size of the smallest, the trigger condition for a rebalance.
    pub fn needs_rebalance(&self) -> bool {
        let sizes: Vec<usize> = self.shards.iter().map(|s| s.len()).collect();
        let max = sizes.iter().copied().max().unwrap_or(0);
        let min = sizes.iter().copied().min().unwrap_or(0);
        min > 0 && max > min * 2
    }

    pub fn last_rebalance(&self) -> Option<DateTime<Utc>> {
        self.last_rebalance
    }
}

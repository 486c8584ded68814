use std::collections::{HashMap, HashSet};

use crate::core::types::{DocId, FieldValue};

/// Maintains `field -> value -> set of docIds` for every declared facet
/// field, flattening array values so each element gets its own bucket entry.
/// Has no teacher counterpart; built fresh in the crate's general idiom
/// (plain structs over `HashMap`, no dyn-trait ceremony).
#[derive(Debug, Clone, Default)]
pub struct FacetIndex {
    buckets: HashMap<String, HashMap<String, HashSet<DocId>>>,
}

impl FacetIndex {
    pub fn new() -> Self {
        FacetIndex::default()
    }

    pub fn index_field(&mut self, doc_id: DocId, field: &str, value: &FieldValue) {
        for key in facet_keys(value) {
            self.buckets
                .entry(field.to_string())
                .or_default()
                .entry(key)
                .or_default()
                .insert(doc_id);
        }
    }

    pub fn remove_document(&mut self, doc_id: DocId) {
        for field_buckets in self.buckets.values_mut() {
            for ids in field_buckets.values_mut() {
                ids.remove(&doc_id);
            }
        }
    }

    /// `field -> value -> count`, counted as the intersection size with
    /// `candidates`, for every declared facet field.
    pub fn facets(&self, candidates: &HashSet<DocId>) -> HashMap<String, HashMap<String, usize>> {
        self.buckets
            .iter()
            .map(|(field, values)| {
                let counts = values
                    .iter()
                    .map(|(value, ids)| (value.clone(), ids.intersection(candidates).count()))
                    .filter(|(_, count)| *count > 0)
                    .collect();
                (field.clone(), counts)
            })
            .collect()
    }

    /// Top `size` values of `field` within `candidates`, sorted by count
    /// descending with a lexicographic tie-break.
    pub fn terms_agg(
        &self,
        candidates: &HashSet<DocId>,
        field: &str,
        size: usize,
    ) -> Vec<(String, usize)> {
        let Some(values) = self.buckets.get(field) else {
            return Vec::new();
        };
        let mut counts: Vec<(String, usize)> = values
            .iter()
            .map(|(value, ids)| (value.clone(), ids.intersection(candidates).count()))
            .filter(|(_, count)| *count > 0)
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.truncate(size);
        counts
    }
}

fn facet_keys(value: &FieldValue) -> Vec<String> {
    match value {
        FieldValue::Array(items) => items.iter().filter_map(FieldValue::as_facet_key).collect(),
        other => other.as_facet_key().into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facets_counts_intersection_with_candidates() {
        let mut idx = FacetIndex::new();
        idx.index_field(DocId(1), "color", &FieldValue::Text("red".into()));
        idx.index_field(DocId(2), "color", &FieldValue::Text("red".into()));
        idx.index_field(DocId(3), "color", &FieldValue::Text("blue".into()));

        let candidates: HashSet<DocId> = [DocId(1), DocId(3)].into_iter().collect();
        let facets = idx.facets(&candidates);
        assert_eq!(facets["color"]["red"], 1);
        assert_eq!(facets["color"]["blue"], 1);
    }

    #[test]
    fn terms_agg_sorts_desc_then_lexicographic() {
        let mut idx = FacetIndex::new();
        idx.index_field(DocId(1), "tag", &FieldValue::Text("a".into()));
        idx.index_field(DocId(2), "tag", &FieldValue::Text("b".into()));
        idx.index_field(DocId(3), "tag", &FieldValue::Text("b".into()));
        idx.index_field(DocId(4), "tag", &FieldValue::Text("c".into()));
        idx.index_field(DocId(5), "tag", &FieldValue::Text("c".into()));

        let candidates: HashSet<DocId> = (1..=5).map(DocId).collect();
        let top = idx.terms_agg(&candidates, "tag", 2);
        assert_eq!(top, vec![("b".to_string(), 2), ("c".to_string(), 2)]);
    }

    #[test]
    fn array_values_flatten_into_individual_buckets() {
        let mut idx = FacetIndex::new();
        let value = FieldValue::Array(vec![
            FieldValue::Text("rust".into()),
            FieldValue::Text("search".into()),
        ]);
        idx.index_field(DocId(1), "tags", &value);
        let candidates: HashSet<DocId> = [DocId(1)].into_iter().collect();
        let facets = idx.facets(&candidates);
        assert_eq!(facets["tags"].len(), 2);
    }

    #[test]
    fn remove_document_clears_all_its_buckets() {
        let mut idx = FacetIndex::new();
        idx.index_field(DocId(1), "color", &FieldValue::Text("red".into()));
        idx.remove_document(DocId(1));
        let candidates: HashSet<DocId> = [DocId(1)].into_iter().collect();
        assert!(idx.facets(&candidates).get("color").map(|m| m.is_empty()).unwrap_or(true));
    }
}

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

use crate::core::types::{DocId, FieldValue};

/// Truncation granularity for `dateHistogram`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateInterval {
    Day,
    Week,
    Month,
    Year,
}

impl DateInterval {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "day" => Some(DateInterval::Day),
            "week" => Some(DateInterval::Week),
            "month" => Some(DateInterval::Month),
            "year" => Some(DateInterval::Year),
            _ => None,
        }
    }

    fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = ts.date_naive();
        match self {
            DateInterval::Day => Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()),
            DateInterval::Week => {
                let weekday = date.weekday().num_days_from_monday();
                let monday = date - Duration::days(weekday as i64);
                Utc.from_utc_datetime(&monday.and_hms_opt(0, 0, 0).unwrap())
            }
            DateInterval::Month => {
                let first = date.with_day(1).unwrap();
                Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0).unwrap())
            }
            DateInterval::Year => {
                let first = date.with_day(1).unwrap().with_month(1).unwrap();
                Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0).unwrap())
            }
        }
    }
}

/// A closed set of aggregation kinds, each a plain struct-like variant,
/// evaluated by `Aggregation::run`. Built fresh — the teacher has no
/// aggregation code at all — in its general idiom of avoiding dyn-trait
/// ceremony where a closed enum covers the cases.
#[derive(Debug, Clone)]
pub enum Aggregation {
    Terms {
        field: String,
        size: usize,
    },
    Histogram {
        field: String,
        interval: f64,
    },
    DateHistogram {
        field: String,
        interval: DateInterval,
    },
    Range {
        field: String,
        ranges: Vec<(f64, f64)>,
    },
    Nested {
        path: String,
        sub_aggs: Vec<(String, Aggregation)>,
    },
    Global {
        sub_aggs: Vec<(String, Aggregation)>,
    },
    Filter {
        extra_candidates: HashSet<DocId>,
        sub_aggs: Vec<(String, Aggregation)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationResult {
    Buckets(Vec<(String, usize)>),
    Sub(HashMap<String, AggregationResult>),
}

/// Looks up a field's value for a document; returns `None` when absent.
pub trait FieldLookup {
    fn get(&self, doc_id: DocId, field: &str) -> Option<FieldValue>;
}

impl<F: Fn(DocId, &str) -> Option<FieldValue>> FieldLookup for F {
    fn get(&self, doc_id: DocId, field: &str) -> Option<FieldValue> {
        self(doc_id, field)
    }
}

impl Aggregation {
    /// `candidates` is the query-filtered set; `universe` is every document
    /// in the index, used by `Global` to ignore the candidate set entirely.
    pub fn run(
        &self,
        candidates: &HashSet<DocId>,
        universe: &HashSet<DocId>,
        lookup: &dyn FieldLookup,
    ) -> AggregationResult {
        match self {
            Aggregation::Terms { field, size } => {
                AggregationResult::Buckets(terms_buckets(candidates, field, *size, lookup))
            }
            Aggregation::Histogram { field, interval } => {
                AggregationResult::Buckets(histogram_buckets(candidates, field, *interval, lookup))
            }
            Aggregation::DateHistogram { field, interval } => AggregationResult::Buckets(
                date_histogram_buckets(candidates, field, *interval, lookup),
            ),
            Aggregation::Range { field, ranges } => {
                AggregationResult::Buckets(range_buckets(candidates, field, ranges, lookup))
            }
            Aggregation::Nested { path, sub_aggs } => {
                let prefixed: Vec<(String, Aggregation)> = sub_aggs
                    .iter()
                    .map(|(name, agg)| (name.clone(), prefix_fields(agg, path)))
                    .collect();
                run_named(&prefixed, candidates, universe, lookup)
            }
            Aggregation::Global { sub_aggs } => run_named(sub_aggs, universe, universe, lookup),
            Aggregation::Filter {
                extra_candidates,
                sub_aggs,
            } => {
                let filtered: HashSet<DocId> =
                    candidates.intersection(extra_candidates).copied().collect();
                run_named(sub_aggs, &filtered, universe, lookup)
            }
        }
    }
}

fn run_named(
    sub_aggs: &[(String, Aggregation)],
    candidates: &HashSet<DocId>,
    universe: &HashSet<DocId>,
    lookup: &dyn FieldLookup,
) -> AggregationResult {
    let mut out = HashMap::new();
    for (name, agg) in sub_aggs {
        out.insert(name.clone(), agg.run(candidates, universe, lookup));
    }
    AggregationResult::Sub(out)
}

/// Rewrites a sub-aggregation's field to live under a nested path, so
/// `Nested { path: "author", .. }` resolves `"name"` as `"author.name"`.
fn prefix_fields(agg: &Aggregation, path: &str) -> Aggregation {
    match agg {
        Aggregation::Terms { field, size } => Aggregation::Terms {
            field: format!("{path}.{field}"),
            size: *size,
        },
        Aggregation::Histogram { field, interval } => Aggregation::Histogram {
            field: format!("{path}.{field}"),
            interval: *interval,
        },
        Aggregation::DateHistogram { field, interval } => Aggregation::DateHistogram {
            field: format!("{path}.{field}"),
            interval: *interval,
        },
        Aggregation::Range { field, ranges } => Aggregation::Range {
            field: format!("{path}.{field}"),
            ranges: ranges.clone(),
        },
        other => other.clone(),
    }
}

fn terms_buckets(
    candidates: &HashSet<DocId>,
    field: &str,
    size: usize,
    lookup: &dyn FieldLookup,
) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for &doc_id in candidates {
        if let Some(value) = lookup.get(doc_id, field)
            && let Some(key) = value.as_facet_key() {
                *counts.entry(key).or_insert(0) += 1;
            }
    }
    let mut buckets: Vec<(String, usize)> = counts.into_iter().collect();
    buckets.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    buckets.truncate(size);
    buckets
}

fn histogram_buckets(
    candidates: &HashSet<DocId>,
    field: &str,
    interval: f64,
    lookup: &dyn FieldLookup,
) -> Vec<(String, usize)> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for &doc_id in candidates {
        if let Some(value) = lookup.get(doc_id, field).and_then(|v| v.as_f64()) {
            let bucket = (value / interval).floor() as i64;
            *counts.entry(bucket).or_insert(0) += 1;
        }
    }
    let mut buckets: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(bucket, count)| ((bucket as f64 * interval).to_string(), count))
        .collect();
    buckets.sort_by(|a, b| a.0.cmp(&b.0));
    buckets
}

fn date_histogram_buckets(
    candidates: &HashSet<DocId>,
    field: &str,
    interval: DateInterval,
    lookup: &dyn FieldLookup,
) -> Vec<(String, usize)> {
    let mut counts: HashMap<DateTime<Utc>, usize> = HashMap::new();
    for &doc_id in candidates {
        let Some(value) = lookup.get(doc_id, field) else {
            continue;
        };
        let ts = match value {
            FieldValue::Timestamp(dt) => Some(dt),
            FieldValue::Text(s) => s.parse::<DateTime<Utc>>().ok(),
            _ => None,
        };
        if let Some(ts) = ts {
            let bucket = interval.truncate(ts);
            *counts.entry(bucket).or_insert(0) += 1;
        }
    }
    let mut buckets: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(bucket, count)| (bucket.to_rfc3339(), count))
        .collect();
    buckets.sort_by(|a, b| a.0.cmp(&b.0));
    buckets
}

fn range_buckets(
    candidates: &HashSet<DocId>,
    field: &str,
    ranges: &[(f64, f64)],
    lookup: &dyn FieldLookup,
) -> Vec<(String, usize)> {
    ranges
        .iter()
        .map(|(from, to)| {
            let count = candidates
                .iter()
                .filter(|&&doc_id| {
                    lookup
                        .get(doc_id, field)
                        .and_then(|v| v.as_f64())
                        .map(|v| v >= *from && v < *to)
                        .unwrap_or(false)
                })
                .count();
            (format!("{from}-{to}"), count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_fixture() -> HashMap<DocId, f64> {
        [(DocId(1), 5.0), (DocId(2), 15.0), (DocId(3), 25.0)]
            .into_iter()
            .collect()
    }

    #[test]
    fn histogram_buckets_by_floor_division() {
        let data = lookup_fixture();
        let lookup = move |doc_id: DocId, _field: &str| data.get(&doc_id).map(|v| FieldValue::Number(*v));
        let candidates: HashSet<DocId> = [DocId(1), DocId(2), DocId(3)].into_iter().collect();
        let agg = Aggregation::Histogram {
            field: "price".into(),
            interval: 10.0,
        };
        let result = agg.run(&candidates, &candidates.clone(), &lookup);
        assert_eq!(
            result,
            AggregationResult::Buckets(vec![
                ("0".to_string(), 1),
                ("10".to_string(), 1),
                ("20".to_string(), 1),
            ])
        );
    }

    #[test]
    fn range_buckets_are_inclusive_exclusive() {
        let data = lookup_fixture();
        let lookup = move |doc_id: DocId, _field: &str| data.get(&doc_id).map(|v| FieldValue::Number(*v));
        let candidates: HashSet<DocId> = [DocId(1), DocId(2), DocId(3)].into_iter().collect();
        let agg = Aggregation::Range {
            field: "price".into(),
            ranges: vec![(0.0, 10.0), (10.0, 30.0)],
        };
        let result = agg.run(&candidates, &candidates.clone(), &lookup);
        match result {
            AggregationResult::Buckets(b) => {
                assert_eq!(b[0], ("0-10".to_string(), 1));
                assert_eq!(b[1], ("10-30".to_string(), 2));
            }
            _ => panic!("expected buckets"),
        }
    }

    #[test]
    fn filter_intersects_extra_candidates_before_sub_aggs() {
        let data = lookup_fixture();
        let lookup = move |doc_id: DocId, _field: &str| data.get(&doc_id).map(|v| FieldValue::Number(*v));
        let candidates: HashSet<DocId> = [DocId(1), DocId(2), DocId(3)].into_iter().collect();
        let agg = Aggregation::Filter {
            extra_candidates: [DocId(2), DocId(3)].into_iter().collect(),
            sub_aggs: vec![(
                "price_range".to_string(),
                Aggregation::Range {
                    field: "price".into(),
                    ranges: vec![(0.0, 100.0)],
                },
            )],
        };
        let result = agg.run(&candidates, &candidates.clone(), &lookup);
        match result {
            AggregationResult::Sub(map) => match &map["price_range"] {
                AggregationResult::Buckets(b) => assert_eq!(b[0].1, 2),
                _ => panic!("expected buckets"),
            },
            _ => panic!("expected sub"),
        }
    }

    #[test]
    fn date_interval_parses_known_names_only() {
        assert_eq!(DateInterval::parse("day"), Some(DateInterval::Day));
        assert_eq!(DateInterval::parse("YEAR"), Some(DateInterval::Year));
        assert_eq!(DateInterval::parse("fortnight"), None);
    }
}

use serde::{Deserialize, Serialize};

use crate::core::types::FieldValue;

/// Closed query tree, grounded on the teacher's `query::ast::Query`, which
/// already has `Term`/`Phrase`/`Bool`/`Range`/`Prefix`/`Wildcard`/`Fuzzy`/
/// `MatchAll`. Adds `Match`, `MatchPhrase`, `GeoDistance`, `Exists`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    MatchAll,
    Match(MatchQuery),
    Term(TermQuery),
    Range(RangeQuery),
    Prefix(PrefixQuery),
    Wildcard(WildcardQuery),
    Fuzzy(FuzzyQuery),
    Phrase(PhraseQuery),
    MatchPhrase(PhraseQuery),
    GeoDistance(GeoDistanceQuery),
    Exists(ExistsQuery),
    Bool(BoolQuery),
}

/// Analyzed, multi-token text match against `field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchQuery {
    pub field: String,
    pub value: String,
    /// `"and"` (default) requires every token; `"or"` requires any.
    pub operator: Option<String>,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub value: String,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseQuery {
    pub field: String,
    pub phrase: Vec<String>,
    pub slop: u32,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    pub must: Vec<Query>,
    pub should: Vec<Query>,
    pub must_not: Vec<Query>,
    pub filter: Vec<Query>,
    pub minimum_should_match: Option<u32>,
    pub boost: Option<f32>,
}

impl BoolQuery {
    pub fn new() -> Self {
        BoolQuery {
            must: Vec::new(),
            should: Vec::new(),
            must_not: Vec::new(),
            filter: Vec::new(),
            minimum_should_match: None,
            boost: None,
        }
    }

    pub fn with_must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    pub fn with_should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    pub fn with_must_not(mut self, query: Query) -> Self {
        self.must_not.push(query);
        self
    }

    pub fn with_filter(mut self, query: Query) -> Self {
        self.filter.push(query);
        self
    }
}

impl Default for BoolQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub field: String,
    pub gt: Option<FieldValue>,
    pub gte: Option<FieldValue>,
    pub lt: Option<FieldValue>,
    pub lte: Option<FieldValue>,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixQuery {
    pub field: String,
    pub prefix: String,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildcardQuery {
    pub field: String,
    pub pattern: String,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyQuery {
    pub field: String,
    pub term: String,
    pub fuzziness: Option<u8>,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoDistanceQuery {
    pub field: String,
    pub lat: f64,
    pub lon: f64,
    pub distance_km: f64,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistsQuery {
    pub field: String,
}

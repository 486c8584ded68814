use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{Error, Result};

/// Dense internal document handle. Postings, facet buckets and doc-length
/// tables key off this instead of the document's string id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for DocId {
    fn from(id: u32) -> Self {
        DocId(id)
    }
}

/// A dynamically-typed field value, as it arrives from ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    GeoPoint { lat: f64, lon: f64 },
    Array(Vec<FieldValue>),
    Object(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Timestamp(dt) => Some(dt.timestamp_millis() as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_geo_point(&self) -> Option<(f64, f64)> {
        match self {
            FieldValue::GeoPoint { lat, lon } => Some((*lat, *lon)),
            FieldValue::Array(items) if items.len() == 2 => {
                let lat = items[0].as_f64()?;
                let lon = items[1].as_f64()?;
                Some((lat, lon))
            }
            FieldValue::Object(map) => {
                let lat = map.get("lat").and_then(FieldValue::as_f64)?;
                let lon = map.get("lon").and_then(FieldValue::as_f64)?;
                Some((lat, lon))
            }
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Stringified form used as a facet-bucket key.
    pub fn as_facet_key(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Number(n) => Some(format_number(*n)),
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Timestamp(dt) => Some(dt.to_rfc3339()),
            FieldValue::GeoPoint { lat, lon } => Some(format!("{lat},{lon}")),
            FieldValue::Array(_) | FieldValue::Object(_) => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A document as it arrives at the ingest boundary: a required string id
/// plus a bag of dynamically-typed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: BTreeMap<String, FieldValue>,
    pub index_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Document {
    pub fn new(id: impl Into<String>, index_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Document {
            id: id.into(),
            fields: BTreeMap::new(),
            index_name: index_name.into(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Parse a raw JSON object into a Document, requiring a non-empty `id`.
    pub fn from_json(value: serde_json::Value, index_name: &str) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::validation("document must be a JSON object"))?;
        let id = obj
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::validation("document is missing a non-empty 'id' field"))?
            .to_string();

        let mut fields = BTreeMap::new();
        for (k, v) in obj {
            if k == "id" {
                continue;
            }
            fields.insert(k.clone(), json_to_field_value(v));
        }

        let now = Utc::now();
        Ok(Document {
            id,
            fields,
            index_name: index_name.to_string(),
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }
}

pub fn json_to_field_value(v: &serde_json::Value) -> FieldValue {
    match v {
        serde_json::Value::Null => FieldValue::Null,
        serde_json::Value::Bool(b) => FieldValue::Bool(*b),
        serde_json::Value::Number(n) => FieldValue::Number(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => FieldValue::Text(s.clone()),
        serde_json::Value::Array(items) => {
            FieldValue::Array(items.iter().map(json_to_field_value).collect())
        }
        serde_json::Value::Object(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                out.insert(k.clone(), json_to_field_value(v));
            }
            FieldValue::Object(out)
        }
    }
}

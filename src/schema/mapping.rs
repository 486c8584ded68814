use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::core::error::{Error, Result};
use crate::core::types::{Document, FieldValue};

/// The full set of field types this engine can infer or accept explicitly.
/// Widened from the teacher's four-variant `FieldType` to the dynamic type
/// lattice described by field-value shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Keyword,
    Email,
    Url,
    Phone,
    Date,
    Boolean,
    Integer,
    Long,
    Short,
    Byte,
    Float,
    Double,
    Number,
    GeoPoint,
    Object,
}

/// A field's declared type plus the analyzer used to index/query it.
/// Mirrors the teacher's `FieldDefinition`, minus the `indexed`/`stored`
/// flags this engine doesn't distinguish (every mapped field is both).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub name: String,
    pub field_type: FieldType,
    pub analyzer: Option<String>,
}

impl FieldMapping {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldMapping {
            name: name.into(),
            field_type,
            analyzer: None,
        }
    }

    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").unwrap());
static ISO_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?)?$").unwrap()
});

const TEXT_NAME_HINTS: &[&str] = &[
    "name", "title", "description", "content", "text", "summary", "city", "country", "address",
    "street", "location", "comment", "note", "message", "subject", "body", "caption", "label",
    "tag", "category",
];

/// Tracks per-index field mappings and infers them from document shape when
/// none is declared yet. Grounded on the teacher's `SchemaWithAnalyzer`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingManager {
    fields: BTreeMap<String, FieldMapping>,
}

impl MappingManager {
    pub fn new() -> Self {
        MappingManager::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldMapping> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, field_type: FieldType) {
        let field = field.into();
        self.fields
            .insert(field.clone(), FieldMapping::new(field, field_type));
    }

    pub fn set_mapping(&mut self, mapping: FieldMapping) {
        self.fields.insert(mapping.name.clone(), mapping);
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldMapping> {
        self.fields.values()
    }

    /// Infer and record a mapping for every field in `document` that isn't
    /// mapped yet. Previously mapped fields are left untouched.
    pub fn auto_map(&mut self, document: &Document) {
        for (name, value) in &document.fields {
            self.auto_map_value(name, value);
        }
    }

    fn auto_map_value(&mut self, path: &str, value: &FieldValue) {
        if self.fields.contains_key(path) {
            return;
        }
        match infer_type(path, value) {
            Some(Inferred::Type(field_type)) => self.set(path, field_type),
            Some(Inferred::Nested(obj)) => {
                for (child_name, child_value) in obj {
                    let dotted = format!("{path}.{child_name}");
                    self.auto_map_value(&dotted, &child_value);
                }
            }
            None => {}
        }
    }

    /// Requires a non-empty `id` (already checked by `Document::from_json`)
    /// and rejects values incompatible with their declared mapping.
    pub fn validate(&self, document: &Document) -> Result<()> {
        if document.id.is_empty() {
            return Err(Error::validation("document id must not be empty"));
        }
        for (name, value) in &document.fields {
            self.validate_value(name, value)?;
        }
        Ok(())
    }

    fn validate_value(&self, path: &str, value: &FieldValue) -> Result<()> {
        let Some(mapping) = self.fields.get(path) else {
            return Ok(());
        };
        match (mapping.field_type, value) {
            (_, FieldValue::Null) => Ok(()),
            (FieldType::Object, FieldValue::Object(obj)) => {
                for (child_name, child_value) in obj {
                    let dotted = format!("{path}.{child_name}");
                    self.validate_value(&dotted, child_value)?;
                }
                Ok(())
            }
            (
                FieldType::Integer | FieldType::Long | FieldType::Short | FieldType::Byte
                | FieldType::Float | FieldType::Double | FieldType::Number,
                FieldValue::Number(_),
            ) => Ok(()),
            (FieldType::Boolean, FieldValue::Bool(_)) => Ok(()),
            (FieldType::Date, FieldValue::Timestamp(_)) => Ok(()),
            (FieldType::Date, FieldValue::Text(s)) if ISO_DATE_RE.is_match(s) => Ok(()),
            (FieldType::Email, FieldValue::Text(s)) if EMAIL_RE.is_match(s) => Ok(()),
            (FieldType::Url, FieldValue::Text(s)) if URL_RE.is_match(s) => Ok(()),
            (FieldType::GeoPoint, _) if value.as_geo_point().is_some() => {
                let (lat, lon) = value.as_geo_point().unwrap();
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                    return Err(Error::validation(format!(
                        "field '{path}' geo_point out of range: lat={lat}, lon={lon}"
                    )));
                }
                Ok(())
            }
            (FieldType::Text | FieldType::Keyword | FieldType::Phone, FieldValue::Text(_)) => Ok(()),
            _ => Err(Error::validation(format!(
                "field '{path}' value incompatible with mapped type {:?}",
                mapping.field_type
            ))),
        }
    }
}

enum Inferred {
    Type(FieldType),
    Nested(BTreeMap<String, FieldValue>),
}

/// Implements the ordered inference rules from the mapping spec.
fn infer_type(path: &str, value: &FieldValue) -> Option<Inferred> {
    match value {
        FieldValue::Null => None,
        FieldValue::Object(obj) => {
            if looks_like_geo_object(obj) {
                Some(Inferred::Type(FieldType::GeoPoint))
            } else if obj.is_empty() {
                None
            } else {
                Some(Inferred::Nested(obj.clone()))
            }
        }
        FieldValue::Array(items) => {
            if items.len() == 2 && items.iter().all(|v| matches!(v, FieldValue::Number(_))) {
                Some(Inferred::Type(FieldType::GeoPoint))
            } else {
                items.first().and_then(|first| infer_type(path, first))
            }
        }
        FieldValue::GeoPoint { .. } => Some(Inferred::Type(FieldType::GeoPoint)),
        FieldValue::Timestamp(_) => Some(Inferred::Type(FieldType::Date)),
        FieldValue::Bool(_) => Some(Inferred::Type(FieldType::Boolean)),
        FieldValue::Number(_) => Some(Inferred::Type(FieldType::Number)),
        FieldValue::Text(s) => Some(Inferred::Type(infer_text_type(path, s))),
    }
}

fn looks_like_geo_object(obj: &BTreeMap<String, FieldValue>) -> bool {
    matches!(obj.get("lat"), Some(FieldValue::Number(_)))
        && matches!(obj.get("lon"), Some(FieldValue::Number(_)))
}

fn infer_text_type(path: &str, s: &str) -> FieldType {
    if s.parse::<DateTime<Utc>>().is_ok() || ISO_DATE_RE.is_match(s) {
        return FieldType::Date;
    }
    if EMAIL_RE.is_match(s) {
        return FieldType::Email;
    }
    if URL_RE.is_match(s) {
        return FieldType::Url;
    }
    if !s.is_empty() && s.parse::<f64>().is_ok() {
        return FieldType::Number;
    }
    let word_count = s.split_whitespace().count();
    if s.len() > 100 || word_count > 1 {
        return FieldType::Text;
    }
    let lower_path = path.rsplit('.').next().unwrap_or(path).to_lowercase();
    if TEXT_NAME_HINTS.iter().any(|hint| lower_path.contains(hint)) {
        return FieldType::Text;
    }
    FieldType::Keyword
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: serde_json::Value) -> Document {
        let mut value = fields;
        value["id"] = json!("doc-1");
        Document::from_json(value, "idx").unwrap()
    }

    #[test]
    fn infers_text_for_long_strings_and_name_hints() {
        let mut mgr = MappingManager::new();
        let d = doc(json!({"title": "A short piece", "summary": "x"}));
        mgr.auto_map(&d);
        assert_eq!(mgr.get("title").unwrap().field_type, FieldType::Text);
        assert_eq!(mgr.get("summary").unwrap().field_type, FieldType::Text);
    }

    #[test]
    fn infers_keyword_for_short_unhinted_strings() {
        let mut mgr = MappingManager::new();
        let d = doc(json!({"sku": "abc123"}));
        mgr.auto_map(&d);
        assert_eq!(mgr.get("sku").unwrap().field_type, FieldType::Keyword);
    }

    #[test]
    fn infers_email_and_url() {
        let mut mgr = MappingManager::new();
        let d = doc(json!({"contact": "a@b.com", "site": "https://example.com"}));
        mgr.auto_map(&d);
        assert_eq!(mgr.get("contact").unwrap().field_type, FieldType::Email);
        assert_eq!(mgr.get("site").unwrap().field_type, FieldType::Url);
    }

    #[test]
    fn infers_geo_point_from_object_and_pair() {
        let mut mgr = MappingManager::new();
        let d = doc(json!({"home": {"lat": 40.7, "lon": -74.0}, "work": [1.0, 2.0]}));
        mgr.auto_map(&d);
        assert_eq!(mgr.get("home").unwrap().field_type, FieldType::GeoPoint);
        assert_eq!(mgr.get("work").unwrap().field_type, FieldType::GeoPoint);
    }

    #[test]
    fn recurses_into_nested_objects_with_dotted_paths() {
        let mut mgr = MappingManager::new();
        let d = doc(json!({"author": {"name": "Long enough name here"}}));
        mgr.auto_map(&d);
        assert_eq!(mgr.get("author.name").unwrap().field_type, FieldType::Text);
    }

    #[test]
    fn validate_rejects_out_of_range_geo_point() {
        let mut mgr = MappingManager::new();
        mgr.set("home", FieldType::GeoPoint);
        let d = doc(json!({"home": {"lat": 999.0, "lon": 0.0}}));
        assert!(mgr.validate(&d).is_err());
    }

    #[test]
    fn validate_rejects_type_mismatch() {
        let mut mgr = MappingManager::new();
        mgr.set("age", FieldType::Number);
        let d = doc(json!({"age": "not a number"}));
        assert!(mgr.validate(&d).is_err());
    }
}

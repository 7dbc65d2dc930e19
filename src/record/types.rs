use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Attribute value as it arrives from the accounting export: usually a plain
/// string, sometimes an object such as `{"value": "7701234567", "source": "1c"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Object(Map<String, Value>),
    Other(Value),
}

impl AttributeValue {
    /// The textual payload, if there is one. Objects expose their `value` field.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(text) => Some(text.as_str()),
            AttributeValue::Object(map) => map.get("value").and_then(Value::as_str),
            AttributeValue::Other(_) => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

/// A reference-data entry (nomenclature item or counterparty) as extracted by
/// the caller's storage layer. The core never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    pub name: String,

    // Opaque key of the row in the source system
    #[serde(default)]
    pub reference: String,

    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,

    #[serde(default, alias = "source_database")]
    pub source_database: String,

    // Caller-assigned data quality in [0, 1]
    #[serde(default, alias = "quality_score", skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

impl Record {
    pub fn new(id: i64, name: &str) -> Self {
        Record {
            id,
            name: name.to_string(),
            reference: String::new(),
            attributes: BTreeMap::new(),
            source_database: String::new(),
            quality_score: None,
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn with_quality_score(mut self, score: f64) -> Self {
        self.quality_score = Some(score);
        self
    }

    pub fn with_source(mut self, source_database: &str, reference: &str) -> Self {
        self.source_database = source_database.to_string();
        self.reference = reference.to_string();
        self
    }

    /// Case-insensitive lookup of the first attribute from `keys` that carries text.
    pub fn attribute_text(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|wanted| {
            self.attributes
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
                .and_then(|(_, value)| value.as_text())
        })
    }
}

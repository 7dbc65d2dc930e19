use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSource {
    Local,
    Ai,
    Fallback,
}

impl fmt::Display for PathSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSource::Local => write!(f, "local"),
            PathSource::Ai => write!(f, "ai"),
            PathSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// Taxonomy leaf assigned to an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub code: String,
    pub name: String,
    // Always within [0, 1]
    pub confidence: f64,
    pub path_source: PathSource,

    // Model that produced an AI result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ClassificationResult {
    pub fn new(code: &str, name: &str, confidence: f64, path_source: PathSource) -> Self {
        ClassificationResult {
            code: code.to_string(),
            name: name.to_string(),
            confidence: clamp_confidence(confidence, 0.0),
            path_source,
            model: None,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.path_source == PathSource::Fallback
    }
}

/// Clamps to [0, 1]; non-finite values become `default`.
pub fn clamp_confidence(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        default.clamp(0.0, 1.0)
    }
}

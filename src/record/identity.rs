use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::Record;

// Accepted attribute names, in lookup order
const TAX_ID_KEYS: &[&str] = &["inn", "tax_id", "taxid"];
const SECONDARY_CODE_KEYS: &[&str] = &["kpp", "secondary_code", "secondary_tax_code"];
const BUSINESS_ID_KEYS: &[&str] = &["ogrn", "ogrnip", "business_id"];
const LEGAL_ADDRESS_KEYS: &[&str] = &["legal_address", "juridical_address", "address"];
const QUALITY_SCORE_KEYS: &[&str] = &["quality_score"];
const CATEGORY_KEYS: &[&str] = &["category", "item_group", "group"];

/// Quality assumed for records whose caller did not supply one.
pub const DEFAULT_QUALITY_SCORE: f64 = 0.5;

/// Typed access to the identity-bearing fields of an entity.
///
/// Every accessor is total: a missing or malformed field is `None`, never an error.
pub trait IdentityBearing {
    fn tax_id(&self) -> Option<&str>;
    fn secondary_code(&self) -> Option<&str>;
    fn business_id(&self) -> Option<&str>;
    fn legal_address(&self) -> Option<&str>;
    fn quality_score(&self) -> Option<f64>;
}

impl IdentityBearing for Record {
    fn tax_id(&self) -> Option<&str> {
        self.attribute_text(TAX_ID_KEYS)
    }

    fn secondary_code(&self) -> Option<&str> {
        self.attribute_text(SECONDARY_CODE_KEYS)
    }

    fn business_id(&self) -> Option<&str> {
        self.attribute_text(BUSINESS_ID_KEYS)
    }

    fn legal_address(&self) -> Option<&str> {
        self.attribute_text(LEGAL_ADDRESS_KEYS)
            .map(str::trim)
            .filter(|address| !address.is_empty())
    }

    fn quality_score(&self) -> Option<f64> {
        self.quality_score.or_else(|| {
            self.attribute_text(QUALITY_SCORE_KEYS)
                .and_then(|raw| raw.trim().parse::<f64>().ok())
        })
    }
}

impl Record {
    pub fn category_hint(&self) -> Option<&str> {
        self.attribute_text(CATEGORY_KEYS)
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
    }
}

/// Identity scheme that made two records duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    InnKpp,
    Inn,
    Ogrn,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::InnKpp => "inn_kpp",
            KeyType::Inn => "inn",
            KeyType::Ogrn => "ogrn",
        }
    }

    pub fn parse(s: &str) -> Option<KeyType> {
        match s.trim() {
            "inn_kpp" => Some(KeyType::InnKpp),
            "inn" => Some(KeyType::Inn),
            "ogrn" => Some(KeyType::Ogrn),
            _ => None,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key derived from a record's identity fields. Many records may share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    TaxPair {
        tax_id: String,
        secondary_code: String,
    },
    TaxId(String),
    BusinessId(String),
}

impl IdentityKey {
    pub fn key_type(&self) -> KeyType {
        match self {
            IdentityKey::TaxPair { .. } => KeyType::InnKpp,
            IdentityKey::TaxId(_) => KeyType::Inn,
            IdentityKey::BusinessId(_) => KeyType::Ogrn,
        }
    }

    pub fn label(&self) -> String {
        match self {
            IdentityKey::TaxPair {
                tax_id,
                secondary_code,
            } => format!("{}_{}", tax_id, secondary_code),
            IdentityKey::TaxId(tax_id) => tax_id.clone(),
            IdentityKey::BusinessId(business_id) => business_id.clone(),
        }
    }
}

/// Normalized identity values of one record. Empty string means absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityFields {
    pub tax_id: String,
    pub secondary_code: String,
    pub business_id: String,
}

impl IdentityFields {
    pub fn has_any(&self) -> bool {
        !self.tax_id.is_empty() || !self.secondary_code.is_empty() || !self.business_id.is_empty()
    }

    pub fn has_secondary_code(&self) -> bool {
        !self.secondary_code.is_empty()
    }

    /// Tax key: the (tax id, secondary code) pair, or the tax id alone when the
    /// secondary code is missing. `None` without a tax id.
    pub fn tax_key(&self) -> Option<IdentityKey> {
        if self.tax_id.is_empty() {
            None
        } else if self.secondary_code.is_empty() {
            Some(IdentityKey::TaxId(self.tax_id.clone()))
        } else {
            Some(IdentityKey::TaxPair {
                tax_id: self.tax_id.clone(),
                secondary_code: self.secondary_code.clone(),
            })
        }
    }

    pub fn business_key(&self) -> Option<IdentityKey> {
        if self.business_id.is_empty() {
            None
        } else {
            Some(IdentityKey::BusinessId(self.business_id.clone()))
        }
    }
}

/// Pulls the normalized identity fields out of a record's attribute bag.
pub fn extract<T: IdentityBearing + ?Sized>(record: &T) -> IdentityFields {
    IdentityFields {
        tax_id: clean_identity_value(record.tax_id()),
        secondary_code: clean_identity_value(record.secondary_code()),
        business_id: clean_identity_value(record.business_id()),
    }
}

/// Quality score clamped to [0, 1], `DEFAULT_QUALITY_SCORE` when absent or NaN.
pub fn effective_quality_score<T: IdentityBearing + ?Sized>(record: &T) -> f64 {
    match record.quality_score() {
        Some(score) if score.is_finite() => score.clamp(0.0, 1.0),
        _ => DEFAULT_QUALITY_SCORE,
    }
}

// Exports pad codes with spaces and fill unknown ones with zeros.
fn clean_identity_value(raw: Option<&str>) -> String {
    let cleaned: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.chars().all(|c| c == '0') {
        String::new()
    } else {
        cleaned
    }
}

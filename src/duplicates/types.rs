use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::record::{KeyType, Record};

/// Separator used when labels of merged groups are combined.
pub const LABEL_SEPARATOR: &str = "|";

/// Identity-key matches are exact, so every group is certain.
pub const EXACT_MATCH_CONFIDENCE: f64 = 1.0;

/// A cluster of records describing the same real-world entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    // Identity key labels, joined with LABEL_SEPARATOR after merges
    pub key: String,

    // Key types that matched, joined with LABEL_SEPARATOR after merges
    pub key_type: String,

    pub items: Vec<Record>,
    pub master_item: Record,
    pub confidence: f64,
}

impl DuplicateGroup {
    /// Distinct key types recorded in `key_type`.
    pub fn key_types(&self) -> Vec<KeyType> {
        let mut types: Vec<KeyType> = self
            .key_type
            .split(LABEL_SEPARATOR)
            .filter_map(KeyType::parse)
            .collect();
        types.sort();
        types.dedup();
        types
    }

    pub fn record_ids(&self) -> Vec<i64> {
        self.items.iter().map(|record| record.id).collect()
    }

    /// Records that fold into the master. This is the one figure used for
    /// "records merged" reporting.
    pub fn merged_count(&self) -> usize {
        self.items.len().saturating_sub(1)
    }
}

/// Group counts by final key type. Each group is counted exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateSummary {
    pub total_groups: usize,
    pub total_records: usize,
    pub merged_records: usize,
    pub by_key_type: BTreeMap<String, usize>,
}

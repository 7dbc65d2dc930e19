use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::classifier::PathSource;

/// Progress counters for one pipeline run, safe to bump from concurrent tasks.
#[derive(Debug, Default)]
pub struct PipelineStageTracker {
    records_seen: AtomicUsize,
    records_with_identity: AtomicUsize,
    duplicate_groups: AtomicUsize,
    records_in_groups: AtomicUsize,
    classified_local: AtomicUsize,
    classified_ai: AtomicUsize,
    classified_fallback: AtomicUsize,
}

/// Point-in-time copy of the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSnapshot {
    pub records_seen: usize,
    pub records_with_identity: usize,
    pub duplicate_groups: usize,
    pub records_in_groups: usize,
    pub classified_local: usize,
    pub classified_ai: usize,
    pub classified_fallback: usize,
}

impl StageSnapshot {
    pub fn classified_total(&self) -> usize {
        self.classified_local + self.classified_ai + self.classified_fallback
    }
}

impl PipelineStageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_seen(&self, has_identity: bool) {
        self.records_seen.fetch_add(1, Ordering::Relaxed);
        if has_identity {
            self.records_with_identity.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn groups_found(&self, groups: usize, records: usize) {
        self.duplicate_groups.fetch_add(groups, Ordering::Relaxed);
        self.records_in_groups.fetch_add(records, Ordering::Relaxed);
    }

    pub fn classified(&self, source: PathSource) {
        let counter = match source {
            PathSource::Local => &self.classified_local,
            PathSource::Ai => &self.classified_ai,
            PathSource::Fallback => &self.classified_fallback,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            records_seen: self.records_seen.load(Ordering::Relaxed),
            records_with_identity: self.records_with_identity.load(Ordering::Relaxed),
            duplicate_groups: self.duplicate_groups.load(Ordering::Relaxed),
            records_in_groups: self.records_in_groups.load(Ordering::Relaxed),
            classified_local: self.classified_local.load(Ordering::Relaxed),
            classified_ai: self.classified_ai.load(Ordering::Relaxed),
            classified_fallback: self.classified_fallback.load(Ordering::Relaxed),
        }
    }
}

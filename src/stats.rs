// Statistics tracker
// Counts-only bookkeeping; matched text never enters logs or stats

use crate::types::FilterType;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatisticsTracker {
    /// Candidate spans per type, before cleanup
    pub detected_by_type: HashMap<FilterType, usize>,
    /// Applied spans per type, after all pipeline stages
    pub applied_by_type: HashMap<FilterType, usize>,
    /// Spans removed by each post-filter
    pub dropped_by_filter: HashMap<String, usize>,
    /// Spans discarded by the overlap resolver
    pub overlap_discards: usize,
    /// Identical-position groups resolved by disambiguation
    pub disambiguated_groups: usize,
    /// Isolated detector failures, by detector name
    pub detector_failures: HashMap<String, usize>,
    pub tokens_issued: usize,
    pub replacement_reuses: usize,
    /// Replacement reuse rate at the end of the request
    pub reuse_rate: f64,
    /// True when Unicode normalization changed the input
    pub normalized: bool,
    pub elapsed_ms: u64,
}

impl StatisticsTracker {
    pub fn new() -> Self {
        StatisticsTracker::default()
    }

    pub fn record_detected(&mut self, filter_type: FilterType, count: usize) {
        if count > 0 {
            *self.detected_by_type.entry(filter_type).or_insert(0) += count;
        }
    }

    pub fn record_applied(&mut self, filter_type: FilterType) {
        *self.applied_by_type.entry(filter_type).or_insert(0) += 1;
    }

    pub fn record_drops(&mut self, dropped_by: &HashMap<&'static str, usize>) {
        for (filter, count) in dropped_by {
            *self
                .dropped_by_filter
                .entry((*filter).to_string())
                .or_insert(0) += count;
        }
    }

    pub fn record_detector_failure(&mut self, detector: &str) {
        *self
            .detector_failures
            .entry(detector.to_string())
            .or_insert(0) += 1;
    }

    pub fn total_detected(&self) -> usize {
        self.detected_by_type.values().sum()
    }

    pub fn total_applied(&self) -> usize {
        self.applied_by_type.values().sum()
    }

    /// Emit the request summary. Only counts and type names; values stay out
    /// of the log stream by construction.
    pub fn log_summary(&self, session_id: &str) {
        tracing::info!(
            session_id,
            detected = self.total_detected(),
            applied = self.total_applied(),
            dropped = self.dropped_by_filter.values().sum::<usize>(),
            overlap_discards = self.overlap_discards,
            disambiguated = self.disambiguated_groups,
            tokens_issued = self.tokens_issued,
            reuse_rate = self.reuse_rate,
            normalized = self.normalized,
            elapsed_ms = self.elapsed_ms,
            "redaction complete"
        );
    }
}

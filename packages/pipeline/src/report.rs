//! Data-quality report for a pipeline run.
//!
//! Non-fatal conditions (excluded cities, clamped zero-crime states,
//! constant columns, dropped duplicates) never abort the run. They are
//! collected here, logged, and persisted as JSON next to the artifact.

use std::collections::BTreeMap;

use serde::Serialize;
use smart_city_city_models::Metric;

use crate::derive::ClampedState;
use crate::join::{DroppedRow, ExcludedCity, ExclusionReason};
use crate::normalize::MetricRange;

/// Row counts read from each source table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputCounts {
    /// Demographics rows.
    pub demographics: usize,
    /// Crime rows.
    pub crime: usize,
    /// Income rows.
    pub income: usize,
}

/// Everything a run observed about its inputs besides the output rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    /// Rows read per source table.
    pub inputs: InputCounts,
    /// Rows in the output table.
    pub output_rows: usize,
    /// Cities left out of the output, sorted by state then city.
    pub excluded: Vec<ExcludedCity>,
    /// Zero-crime states whose safety index was clamped.
    pub clamped_states: Vec<ClampedState>,
    /// Observed range per metric.
    pub ranges: Vec<MetricRange>,
    /// Duplicate rows dropped under the keep-first policy.
    pub duplicates_dropped: Vec<DroppedRow>,
}

impl PipelineReport {
    /// Number of excluded cities.
    #[must_use]
    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }

    /// Excluded city counts grouped by reason.
    #[must_use]
    pub fn excluded_by_reason(&self) -> BTreeMap<ExclusionReason, usize> {
        let mut counts = BTreeMap::new();
        for city in &self.excluded {
            *counts.entry(city.reason).or_insert(0) += 1;
        }
        counts
    }

    /// Metrics whose column was constant.
    #[must_use]
    pub fn degenerate_metrics(&self) -> Vec<Metric> {
        self.ranges
            .iter()
            .filter(|r| r.degenerate)
            .map(|r| r.metric)
            .collect()
    }

    /// Writes a one-screen summary to the log.
    pub fn log_summary(&self) {
        log::info!(
            "Merged {} cities from {} demographic, {} crime, {} income rows",
            self.output_rows,
            self.inputs.demographics,
            self.inputs.crime,
            self.inputs.income
        );

        for (reason, count) in self.excluded_by_reason() {
            log::warn!("  excluded {count} cities: {reason}");
        }

        for metric in self.degenerate_metrics() {
            log::warn!("  degenerate range: {}", metric.raw_column());
        }

        if !self.duplicates_dropped.is_empty() {
            log::warn!(
                "  dropped {} duplicate source rows",
                self.duplicates_dropped.len()
            );
        }
    }
}

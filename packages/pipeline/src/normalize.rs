//! Global min-max normalization and the default livability score.
//!
//! Each metric is rescaled over the whole table, not per state, so the
//! normalized values are comparable across every city. A column whose
//! maximum equals its minimum normalizes to `0.0` everywhere.

use serde::Serialize;
use smart_city_city_models::{CityRecord, LIVABILITY_WEIGHTS, Metric};

/// Observed range of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnRange {
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
}

impl ColumnRange {
    /// Range of `values`, or `None` if there are none.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(Self { min: v, max: v }),
            Some(r) => Some(Self {
                min: r.min.min(v),
                max: r.max.max(v),
            }),
        })
    }

    /// Whether every value in the column is the same.
    #[must_use]
    pub fn is_degenerate(self) -> bool {
        self.max <= self.min
    }

    /// Rescales `value` into `[0, 1]`.
    #[must_use]
    pub fn normalize(self, value: f64) -> f64 {
        if self.max > self.min {
            (value - self.min) / (self.max - self.min)
        } else {
            0.0
        }
    }
}

/// Range observed for one metric during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRange {
    /// The metric.
    pub metric: Metric,
    /// Its observed range.
    #[serde(flatten)]
    pub range: ColumnRange,
    /// Whether the column was constant.
    pub degenerate: bool,
}

/// Normalizes all three metrics in place and returns their ranges.
///
/// An empty slice yields no ranges.
pub fn normalize_metrics(records: &mut [CityRecord]) -> Vec<MetricRange> {
    let mut ranges = Vec::with_capacity(Metric::ALL.len());

    for metric in Metric::ALL {
        let Some(range) = ColumnRange::from_values(records.iter().map(|r| metric.raw(r))) else {
            continue;
        };

        let degenerate = range.is_degenerate();
        if degenerate {
            log::warn!(
                "{} is constant ({}); {} is 0.0 for every city",
                metric.raw_column(),
                range.min,
                metric.norm_column()
            );
        }

        for record in records.iter_mut() {
            let value = range.normalize(metric.raw(record));
            metric.set_normalized(record, value);
        }

        ranges.push(MetricRange {
            metric,
            range,
            degenerate,
        });
    }

    ranges
}

/// Fills in [`CityRecord::livability_score`]. Must run after
/// [`normalize_metrics`].
pub fn apply_livability_score(records: &mut [CityRecord]) {
    for record in records {
        record.livability_score = LIVABILITY_WEIGHTS.weighted_sum(record);
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! City data types shared across the smart-city toolchain.
//!
//! Defines the three source row types (demographics, state crime rates,
//! income), the merged [`CityRecord`] produced by the pipeline, the
//! immutable [`CityTable`] handle the scoring service reads from, and the
//! [`Metric`] and [`ScoreWeights`] types that tie the two together.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One row of the demographics table. Source of truth for city identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityDemographic {
    /// City name.
    pub city: String,
    /// State name or abbreviation, matched verbatim against the other tables.
    pub state: String,
    /// Resident population.
    pub population: u64,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

/// One row of the state-level crime table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrimeRecord {
    /// State name or abbreviation.
    pub state: String,
    /// Violent crimes per 100k residents. `None` when the cell is empty.
    pub violent_crime_rate_2020: Option<f64>,
}

/// One row of the city-level income table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeRecord {
    /// City name.
    pub city: String,
    /// State name or abbreviation.
    pub state: String,
    /// Median household income. `None` when the cell is empty.
    pub median_household_income_2020: Option<f64>,
    /// Reference average income. `None` when the cell is empty.
    pub avg_income: Option<f64>,
}

/// A fully joined, derived, and normalized city row.
///
/// Field order matches the column order of the persisted artifact. Column
/// names are the serde names below; consumers must address them by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    /// City name.
    pub city: String,
    /// State name or abbreviation.
    pub state: String,
    /// Resident population.
    pub population: u64,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Median household income.
    pub median_household_income_2020: f64,
    /// State violent crime rate per 100k.
    pub violent_crime_rate_2020: f64,
    /// Reference average income.
    pub avg_income: f64,
    /// `1 / violent_crime_rate_2020`, clamped when the rate is zero.
    #[serde(rename = "SafetyIndex")]
    pub safety_index: f64,
    /// `median_household_income_2020 / avg_income`.
    #[serde(rename = "AffordabilityIndex")]
    pub affordability_index: f64,
    /// Min-max normalized safety index.
    #[serde(rename = "SafetyIndex_norm")]
    pub safety_index_norm: f64,
    /// Min-max normalized median household income.
    #[serde(rename = "median_household_income_2020_norm")]
    pub median_household_income_2020_norm: f64,
    /// Min-max normalized affordability index.
    #[serde(rename = "AffordabilityIndex_norm")]
    pub affordability_index_norm: f64,
    /// Fixed-weight default composite score.
    #[serde(rename = "LivabilityScore")]
    pub livability_score: f64,
}

impl CityRecord {
    /// Returns the `(city, state)` identity of this record.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.city, &self.state)
    }
}

/// The three metrics of interest that feed every composite score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Metric {
    /// Inverse of the state violent crime rate.
    Safety,
    /// Median household income.
    Income,
    /// Median income relative to the reference average.
    Affordability,
}

impl Metric {
    /// All metrics, in composite-score order.
    pub const ALL: [Self; 3] = [Self::Safety, Self::Income, Self::Affordability];

    /// Name of the raw column this metric is normalized from.
    #[must_use]
    pub const fn raw_column(self) -> &'static str {
        match self {
            Self::Safety => "SafetyIndex",
            Self::Income => "median_household_income_2020",
            Self::Affordability => "AffordabilityIndex",
        }
    }

    /// Name of the normalized output column.
    #[must_use]
    pub const fn norm_column(self) -> &'static str {
        match self {
            Self::Safety => "SafetyIndex_norm",
            Self::Income => "median_household_income_2020_norm",
            Self::Affordability => "AffordabilityIndex_norm",
        }
    }

    /// Reads the raw value of this metric from a record.
    #[must_use]
    pub const fn raw(self, record: &CityRecord) -> f64 {
        match self {
            Self::Safety => record.safety_index,
            Self::Income => record.median_household_income_2020,
            Self::Affordability => record.affordability_index,
        }
    }

    /// Reads the normalized value of this metric from a record.
    #[must_use]
    pub const fn normalized(self, record: &CityRecord) -> f64 {
        match self {
            Self::Safety => record.safety_index_norm,
            Self::Income => record.median_household_income_2020_norm,
            Self::Affordability => record.affordability_index_norm,
        }
    }

    /// Writes the normalized value of this metric into a record.
    pub const fn set_normalized(self, record: &mut CityRecord, value: f64) {
        match self {
            Self::Safety => record.safety_index_norm = value,
            Self::Income => record.median_household_income_2020_norm = value,
            Self::Affordability => record.affordability_index_norm = value,
        }
    }
}

/// A weight triple over the three metrics.
///
/// Values come from user controls and are not assumed to be normalized or
/// even non-negative; the scoring service sanitizes them before use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Weight on [`Metric::Safety`].
    pub safety: f64,
    /// Weight on [`Metric::Income`].
    pub income: f64,
    /// Weight on [`Metric::Affordability`].
    pub affordability: f64,
}

impl ScoreWeights {
    /// Creates a weight triple.
    #[must_use]
    pub const fn new(safety: f64, income: f64, affordability: f64) -> Self {
        Self {
            safety,
            income,
            affordability,
        }
    }

    /// Returns the weight for a single metric.
    #[must_use]
    pub const fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Safety => self.safety,
            Metric::Income => self.income,
            Metric::Affordability => self.affordability,
        }
    }

    /// Sum of the three weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.safety + self.income + self.affordability
    }

    /// Weighted sum of a record's normalized metrics. The weights are used
    /// as-is; callers normalize them first when a `[0, 1]` score is needed.
    #[must_use]
    pub fn weighted_sum(&self, record: &CityRecord) -> f64 {
        Metric::ALL
            .iter()
            .map(|m| self.get(*m) * m.normalized(record))
            .sum()
    }
}

/// Fixed weights behind [`CityRecord::livability_score`].
pub const LIVABILITY_WEIGHTS: ScoreWeights = ScoreWeights::new(0.4, 0.3, 0.3);

/// A named default weight triple, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightProfile {
    /// Unique profile identifier (e.g., `"individual"`).
    pub id: String,
    /// Human-readable name (e.g., "Individual (housing)").
    pub name: String,
    /// What the profile prioritizes.
    pub description: String,
    /// Default weights for this profile.
    pub weights: ScoreWeights,
}

/// Immutable handle over the merged city table.
///
/// Loaded once and passed explicitly to whatever needs it; there is no
/// process-wide cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityTable {
    records: Vec<CityRecord>,
}

impl CityTable {
    /// Wraps a set of records. Row order is preserved and is the tie-break
    /// order for every ranking computed over the table.
    #[must_use]
    pub const fn new(records: Vec<CityRecord>) -> Self {
        Self { records }
    }

    /// All records in table order.
    #[must_use]
    pub fn records(&self) -> &[CityRecord] {
        &self.records
    }

    /// Number of cities in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no cities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a city by its `(city, state)` identity.
    #[must_use]
    pub fn find(&self, city: &str, state: &str) -> Option<&CityRecord> {
        self.records.iter().find(|r| r.key() == (city, state))
    }

    /// Consumes the handle, returning the records.
    #[must_use]
    pub fn into_records(self) -> Vec<CityRecord> {
        self.records
    }
}

impl From<Vec<CityRecord>> for CityTable {
    fn from(records: Vec<CityRecord>) -> Self {
        Self::new(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CityRecord {
        CityRecord {
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            population: 114_394,
            lat: 39.7817,
            lng: -89.6501,
            median_household_income_2020: 55_000.0,
            violent_crime_rate_2020: 425.8,
            avg_income: 50_000.0,
            safety_index: 1.0 / 425.8,
            affordability_index: 1.1,
            safety_index_norm: 0.2,
            median_household_income_2020_norm: 0.5,
            affordability_index_norm: 0.7,
            livability_score: 0.0,
        }
    }

    #[test]
    fn metric_round_trips_through_strum() {
        for metric in Metric::ALL {
            let parsed: Metric = metric.to_string().parse().unwrap();
            assert_eq!(parsed, metric);
        }
        assert_eq!("affordability".parse::<Metric>().unwrap(), Metric::Affordability);
    }

    #[test]
    fn metric_accessors_read_and_write_normalized_fields() {
        let mut r = record();
        assert!((Metric::Income.normalized(&r) - 0.5).abs() < f64::EPSILON);
        Metric::Safety.set_normalized(&mut r, 0.9);
        assert!((r.safety_index_norm - 0.9).abs() < f64::EPSILON);
        assert!((Metric::Affordability.raw(&r) - 1.1).abs() < f64::EPSILON);
    }

    #[test]
    fn livability_weights_sum_to_one() {
        assert!((LIVABILITY_WEIGHTS.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn table_finds_by_identity() {
        let table = CityTable::new(vec![record()]);
        assert!(table.find("Springfield", "IL").is_some());
        assert!(table.find("Springfield", "MO").is_none());
        assert_eq!(table.len(), 1);
    }
}

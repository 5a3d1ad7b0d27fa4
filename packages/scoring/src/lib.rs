#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scoring service for the smart-city table.
//!
//! Turns a caller-supplied weight triple into a per-city `UserScore` over
//! the pre-normalized metrics and ranks the table by it. Everything here is
//! a pure function of an immutable [`CityTable`], so concurrent requests
//! against the same table need no coordination.

pub mod registry;

use std::cmp::Ordering;

use serde::Serialize;
use smart_city_city_models::{CityRecord, CityTable, Metric, ScoreWeights};

/// Default number of cities returned by a ranking.
pub const DEFAULT_TOP_N: usize = 10;

/// Weights that are non-negative and sum to 1.
///
/// Only constructible through [`normalize_weights`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedWeights(ScoreWeights);

impl NormalizedWeights {
    /// Equal weight on every metric.
    pub const EQUAL: Self = Self(ScoreWeights::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0));

    /// The underlying weight triple.
    #[must_use]
    pub const fn weights(&self) -> ScoreWeights {
        self.0
    }
}

fn sanitize(metric: Metric, value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        log::warn!("Ignoring invalid {metric} weight {value}; using 0");
        0.0
    }
}

/// Normalizes a weight triple so it sums to 1.
///
/// Negative or non-finite weights are treated as zero. If nothing positive
/// remains, every metric gets a third. Weights whose sum would overflow are
/// first scaled down by the largest one.
#[must_use]
pub fn normalize_weights(weights: ScoreWeights) -> NormalizedWeights {
    let mut clamped = ScoreWeights::new(
        sanitize(Metric::Safety, weights.safety),
        sanitize(Metric::Income, weights.income),
        sanitize(Metric::Affordability, weights.affordability),
    );

    if !clamped.sum().is_finite() {
        let largest = clamped.safety.max(clamped.income).max(clamped.affordability);
        clamped = ScoreWeights::new(
            clamped.safety / largest,
            clamped.income / largest,
            clamped.affordability / largest,
        );
    }

    let total = clamped.sum();
    if total == 0.0 {
        return NormalizedWeights::EQUAL;
    }

    NormalizedWeights(ScoreWeights::new(
        clamped.safety / total,
        clamped.income / total,
        clamped.affordability / total,
    ))
}

/// `UserScore` of one record.
#[must_use]
pub fn user_score(record: &CityRecord, weights: &NormalizedWeights) -> f64 {
    weights.0.weighted_sum(record)
}

/// A city paired with its `UserScore`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCity<'a> {
    /// The scored record.
    pub record: &'a CityRecord,
    /// Its weighted composite score.
    pub user_score: f64,
}

/// A table ranked by `UserScore`, highest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking<'a> {
    weights: NormalizedWeights,
    ranked: Vec<ScoredCity<'a>>,
    top_n: usize,
}

impl<'a> Ranking<'a> {
    /// The weights actually applied.
    #[must_use]
    pub const fn weights(&self) -> NormalizedWeights {
        self.weights
    }

    /// The first `top_n` cities (fewer if the table is smaller).
    #[must_use]
    pub fn top(&self) -> &[ScoredCity<'a>] {
        &self.ranked[..self.top_n.min(self.ranked.len())]
    }

    /// Every city, ranked.
    #[must_use]
    pub fn ranked(&self) -> &[ScoredCity<'a>] {
        &self.ranked
    }

    /// Consumes the ranking, returning every city ranked.
    #[must_use]
    pub fn into_ranked(self) -> Vec<ScoredCity<'a>> {
        self.ranked
    }
}

/// Sorts descending by score. Stable, so equal scores keep their input order.
fn sort_descending<T>(items: &mut [T], score: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(Ordering::Equal));
}

/// Scores every city in `table` and ranks them.
#[must_use]
pub fn score(table: &CityTable, weights: ScoreWeights, top_n: usize) -> Ranking<'_> {
    let weights = normalize_weights(weights);

    let mut ranked: Vec<ScoredCity<'_>> = table
        .records()
        .iter()
        .map(|record| ScoredCity {
            record,
            user_score: user_score(record, &weights),
        })
        .collect();
    sort_descending(&mut ranked, |c| c.user_score);

    log::debug!(
        "Scored {} cities with weights {:?}",
        ranked.len(),
        weights.weights()
    );

    Ranking {
        weights,
        ranked,
        top_n,
    }
}

/// Every record ranked by the persisted `LivabilityScore`.
#[must_use]
pub fn rank_by_livability(table: &CityTable) -> Vec<&CityRecord> {
    let mut ranked: Vec<&CityRecord> = table.records().iter().collect();
    sort_descending(&mut ranked, |r| r.livability_score);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(city: &str, s: f64, i: f64, f: f64) -> CityRecord {
        CityRecord {
            city: city.to_string(),
            state: "ST".to_string(),
            population: 1,
            lat: 0.0,
            lng: 0.0,
            median_household_income_2020: 0.0,
            violent_crime_rate_2020: 1.0,
            avg_income: 1.0,
            safety_index: 1.0,
            affordability_index: 0.0,
            safety_index_norm: s,
            median_household_income_2020_norm: i,
            affordability_index_norm: f,
            livability_score: 0.4 * s + 0.3 * i + 0.3 * f,
        }
    }

    /// Normalized fields of the end-to-end fixture (2 states, 4 cities).
    fn fixture() -> CityTable {
        CityTable::new(vec![
            record("Alpha", 1.0, 0.5, 0.5),
            record("Beta", 1.0, 0.0, 0.0),
            record("Delta", 0.0, 0.25, 0.25),
            record("Gamma", 0.0, 1.0, 1.0),
        ])
    }

    #[test]
    fn weights_sum_to_one() {
        for w in [
            ScoreWeights::new(0.45, 0.25, 0.30),
            ScoreWeights::new(3.0, 1.0, 0.0),
            ScoreWeights::new(0.0, 0.0, 7.5),
        ] {
            let n = normalize_weights(w).weights();
            assert!((n.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn all_zero_weights_fall_back_to_thirds() {
        assert_eq!(
            normalize_weights(ScoreWeights::default()),
            NormalizedWeights::EQUAL
        );
    }

    #[test]
    fn negative_and_nan_weights_are_clamped_to_zero() {
        let n = normalize_weights(ScoreWeights::new(-2.0, f64::NAN, 4.0)).weights();
        assert!(n.safety.abs() < f64::EPSILON);
        assert!(n.income.abs() < f64::EPSILON);
        assert!((n.affordability - 1.0).abs() < f64::EPSILON);

        let all_bad = normalize_weights(ScoreWeights::new(-1.0, -1.0, f64::INFINITY));
        assert_eq!(all_bad, NormalizedWeights::EQUAL);
    }

    #[test]
    fn huge_weights_do_not_overflow() {
        let n = normalize_weights(ScoreWeights::new(1e308, 1e308, 0.0)).weights();
        assert!((n.sum() - 1.0).abs() < 1e-12);
        assert!((n.safety - 0.5).abs() < 1e-12);
        assert!((n.income - 0.5).abs() < 1e-12);
        assert!(n.affordability.abs() < f64::EPSILON);

        let table = fixture();
        let ranking = score(&table, ScoreWeights::new(f64::MAX, f64::MAX, f64::MAX), 1);
        assert!(ranking.ranked().iter().any(|c| c.user_score > 0.0));
    }

    #[test]
    fn user_score_matches_weighted_average() {
        let table = fixture();
        for (a, b, c) in [(1.0, 2.0, 3.0), (0.45, 0.25, 0.30), (0.0, 5.0, 0.0)] {
            let ranking = score(&table, ScoreWeights::new(a, b, c), 10);
            for scored in ranking.ranked() {
                let r = scored.record;
                let expected = (a * r.safety_index_norm
                    + b * r.median_household_income_2020_norm
                    + c * r.affordability_index_norm)
                    / (a + b + c);
                assert!((scored.user_score - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn zero_weights_score_is_unweighted_average() {
        let table = fixture();
        let ranking = score(&table, ScoreWeights::new(0.0, 0.0, 0.0), 10);
        for scored in ranking.ranked() {
            let r = scored.record;
            let expected = (r.safety_index_norm
                + r.median_household_income_2020_norm
                + r.affordability_index_norm)
                / 3.0;
            assert!((scored.user_score - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn ranks_fixture_top_two() {
        let table = fixture();
        let ranking = score(&table, ScoreWeights::new(0.45, 0.25, 0.30), 2);
        let top: Vec<&str> = ranking.top().iter().map(|c| c.record.city.as_str()).collect();
        assert_eq!(top, vec!["Alpha", "Gamma"]);
        assert!((ranking.top()[0].user_score - 0.725).abs() < 1e-12);
        assert!((ranking.top()[1].user_score - 0.55).abs() < 1e-12);
        assert_eq!(ranking.ranked().len(), 4);
    }

    #[test]
    fn ties_keep_table_order() {
        let table = CityTable::new(vec![
            record("First", 0.5, 0.5, 0.5),
            record("Second", 0.5, 0.5, 0.5),
            record("Third", 1.0, 1.0, 1.0),
        ]);
        let ranking = score(&table, ScoreWeights::new(1.0, 1.0, 1.0), 3);
        let order: Vec<&str> = ranking.ranked().iter().map(|c| c.record.city.as_str()).collect();
        assert_eq!(order, vec!["Third", "First", "Second"]);
    }

    #[test]
    fn top_n_larger_than_table_returns_everything() {
        let table = fixture();
        assert_eq!(score(&table, ScoreWeights::default(), 50).top().len(), 4);
        assert!(score(&table, ScoreWeights::default(), 0).top().is_empty());
    }

    #[test]
    fn livability_ranking_is_descending() {
        let table = fixture();
        let order: Vec<&str> = rank_by_livability(&table)
            .iter()
            .map(|r| r.city.as_str())
            .collect();
        assert_eq!(order, vec!["Alpha", "Gamma", "Beta", "Delta"]);
    }
}

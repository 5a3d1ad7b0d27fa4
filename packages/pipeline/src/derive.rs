//! Derived per-city metrics.
//!
//! `SafetyIndex = 1 / violent_crime_rate_2020` and
//! `AffordabilityIndex = median_household_income_2020 / avg_income`.
//!
//! A zero crime rate leaves the safety index undefined. Those cities get
//! the largest finite safety index observed in the dataset instead, so an
//! infinite value never reaches normalization.

use std::collections::BTreeSet;

use serde::Serialize;
use smart_city_city_models::CityRecord;

use crate::join::JoinedCity;

/// A state whose zero crime rate was clamped to the sentinel safety index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClampedState {
    /// State.
    pub state: String,
    /// Safety index assigned to every city in the state.
    pub safety_index: f64,
}

/// Output of [`derive`].
#[derive(Debug, Clone, Default)]
pub struct Derived {
    /// One record per joined city, normalized fields still zero.
    pub records: Vec<CityRecord>,
    /// States whose safety index was clamped, sorted by state.
    pub clamped: Vec<ClampedState>,
}

/// Inverse crime rate, or `None` when it would not be finite.
#[must_use]
pub fn safety_index(violent_crime_rate: f64) -> Option<f64> {
    Some(1.0 / violent_crime_rate).filter(|v| violent_crime_rate > 0.0 && v.is_finite())
}

/// Median income relative to the reference average.
#[must_use]
pub fn affordability_index(median_household_income: f64, avg_income: f64) -> f64 {
    median_household_income / avg_income
}

/// Builds a [`CityRecord`] for every joined city.
#[must_use]
pub fn derive(joined: &[JoinedCity<'_>]) -> Derived {
    let raw: Vec<Option<f64>> = joined
        .iter()
        .map(|j| safety_index(j.violent_crime_rate))
        .collect();

    let max_finite = raw.iter().flatten().copied().reduce(f64::max);
    let sentinel = max_finite.unwrap_or(0.0);

    let mut clamped_states = BTreeSet::new();
    let mut records = Vec::with_capacity(joined.len());

    for (city, safety) in joined.iter().zip(raw) {
        let demographic = city.demographic;
        let safety = safety.unwrap_or_else(|| {
            clamped_states.insert(demographic.state.as_str());
            sentinel
        });

        records.push(CityRecord {
            city: demographic.city.clone(),
            state: demographic.state.clone(),
            population: demographic.population,
            lat: demographic.lat,
            lng: demographic.lng,
            median_household_income_2020: city.median_household_income,
            violent_crime_rate_2020: city.violent_crime_rate,
            avg_income: city.avg_income,
            safety_index: safety,
            affordability_index: affordability_index(
                city.median_household_income,
                city.avg_income,
            ),
            safety_index_norm: 0.0,
            median_household_income_2020_norm: 0.0,
            affordability_index_norm: 0.0,
            livability_score: 0.0,
        });
    }

    if !clamped_states.is_empty() {
        if max_finite.is_none() {
            log::warn!("No state has a non-zero crime rate; every safety index is {sentinel}");
        }
        log::warn!(
            "Clamped safety index to {sentinel} for zero-crime states: {}",
            clamped_states.iter().copied().collect::<Vec<_>>().join(", ")
        );
    }

    let clamped = clamped_states
        .into_iter()
        .map(|state| ClampedState {
            state: state.to_string(),
            safety_index: sentinel,
        })
        .collect();

    Derived { records, clamped }
}

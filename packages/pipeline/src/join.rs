//! City-level and state-level joins.
//!
//! Demographics are left-joined to income on `(city, state)` and then to
//! crime on `state` alone, so every city in a state shares that state's
//! crime rate. Every demographic row comes out of the join either as a
//! [`JoinedCity`] with all raw metrics present, or as an [`ExcludedCity`]
//! with the reason it cannot be ranked. Nothing is interpolated.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::{Deserialize, Serialize};
use smart_city_city_models::{CityDemographic, CrimeRecord, IncomeRecord};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::derive::affordability_index;
use crate::load::{DataLoadError, SourceTable};

/// What to do when a join key occurs more than once in a source table.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Fail the load with [`DataLoadError::DuplicateKey`].
    #[default]
    Reject,
    /// Keep the first occurrence and drop the rest.
    KeepFirst,
}

/// Why a demographic row was left out of the output.
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
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExclusionReason {
    /// No income row for the city's `(city, state)`.
    NoIncomeMatch,
    /// The income row has an empty income or average income cell.
    MissingIncomeValue,
    /// No crime row for the city's state.
    NoCrimeMatch,
    /// The crime row has an empty rate cell.
    MissingCrimeValue,
    /// Average income is zero, so affordability is undefined.
    ZeroAverageIncome,
    /// Average income is so small relative to the median that affordability
    /// overflows to infinity.
    UnboundedAffordability,
}

/// A demographic row that could not be joined into a complete record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedCity {
    /// City name.
    pub city: String,
    /// State.
    pub state: String,
    /// Why it was excluded.
    pub reason: ExclusionReason,
}

/// A duplicate source row dropped under [`DuplicatePolicy::KeepFirst`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedRow {
    /// Source table.
    pub table: SourceTable,
    /// Duplicated key.
    pub key: String,
    /// 1-based data row that was dropped.
    pub row: usize,
}

/// Join key: `(state, city)` for city-level tables, `state` for crime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct JoinKey<'a> {
    state: &'a str,
    city: Option<&'a str>,
}

impl<'a> JoinKey<'a> {
    /// City-level key.
    #[must_use]
    pub const fn city(city: &'a str, state: &'a str) -> Self {
        Self {
            state,
            city: Some(city),
        }
    }

    /// State-level key.
    #[must_use]
    pub const fn state(state: &'a str) -> Self {
        Self { state, city: None }
    }
}

impl std::fmt::Display for JoinKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.city {
            Some(city) => write!(f, "{city}, {}", self.state),
            None => write!(f, "{}", self.state),
        }
    }
}

/// A demographic row with every raw metric it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedCity<'a> {
    /// The demographic row.
    pub demographic: &'a CityDemographic,
    /// Median household income.
    pub median_household_income: f64,
    /// Reference average income (non-zero).
    pub avg_income: f64,
    /// State violent crime rate.
    pub violent_crime_rate: f64,
}

/// Output of [`join`].
#[derive(Debug, Clone, Default)]
pub struct JoinOutcome<'a> {
    /// Complete rows, in demographic order.
    pub joined: Vec<JoinedCity<'a>>,
    /// Rows left out, in demographic order.
    pub excluded: Vec<ExcludedCity>,
    /// Duplicate source rows dropped under [`DuplicatePolicy::KeepFirst`].
    pub dropped: Vec<DroppedRow>,
}

/// Indexes rows by key, applying `policy` to repeated keys.
fn index_rows<'a, T>(
    rows: &'a [T],
    table: SourceTable,
    policy: DuplicatePolicy,
    key: impl Fn(&'a T) -> JoinKey<'a>,
    dropped: &mut Vec<DroppedRow>,
) -> Result<BTreeMap<JoinKey<'a>, &'a T>, DataLoadError> {
    let mut index = BTreeMap::new();

    for (i, row) in rows.iter().enumerate() {
        let k = key(row);
        match index.entry(k) {
            Entry::Vacant(e) => {
                e.insert(row);
            }
            Entry::Occupied(_) => match policy {
                DuplicatePolicy::Reject => {
                    return Err(DataLoadError::DuplicateKey {
                        table,
                        key: k.to_string(),
                        row: i + 1,
                    });
                }
                DuplicatePolicy::KeepFirst => {
                    log::warn!("Dropping duplicate {table} row {} for '{k}'", i + 1);
                    dropped.push(DroppedRow {
                        table,
                        key: k.to_string(),
                        row: i + 1,
                    });
                }
            },
        }
    }

    Ok(index)
}

/// Joins demographics with income on `(city, state)` and with crime on
/// `state`.
///
/// # Errors
///
/// Returns [`DataLoadError::DuplicateKey`] if any table repeats a key and
/// `policy` is [`DuplicatePolicy::Reject`].
pub fn join<'a>(
    demographics: &'a [CityDemographic],
    crime: &'a [CrimeRecord],
    income: &'a [IncomeRecord],
    policy: DuplicatePolicy,
) -> Result<JoinOutcome<'a>, DataLoadError> {
    let mut outcome = JoinOutcome::default();

    let demographic_index = index_rows(
        demographics,
        SourceTable::Demographics,
        policy,
        |d| JoinKey::city(&d.city, &d.state),
        &mut outcome.dropped,
    )?;
    let income_index = index_rows(
        income,
        SourceTable::Income,
        policy,
        |r| JoinKey::city(&r.city, &r.state),
        &mut outcome.dropped,
    )?;
    let crime_index = index_rows(
        crime,
        SourceTable::Crime,
        policy,
        |r| JoinKey::state(&r.state),
        &mut outcome.dropped,
    )?;

    for demographic in demographics {
        let key = JoinKey::city(&demographic.city, &demographic.state);

        // Only the retained occurrence of a duplicated city goes through.
        if !demographic_index
            .get(&key)
            .is_some_and(|kept| std::ptr::eq(*kept, demographic))
        {
            continue;
        }

        match join_one(demographic, &income_index, &crime_index) {
            Ok(joined) => outcome.joined.push(joined),
            Err(reason) => {
                log::debug!(
                    "Excluding {}, {}: {reason}",
                    demographic.city,
                    demographic.state
                );
                outcome.excluded.push(ExcludedCity {
                    city: demographic.city.clone(),
                    state: demographic.state.clone(),
                    reason,
                });
            }
        }
    }

    if !outcome.excluded.is_empty() {
        log::warn!(
            "Excluded {} of {} cities with incomplete source data",
            outcome.excluded.len(),
            outcome.excluded.len() + outcome.joined.len()
        );
    }

    Ok(outcome)
}

fn join_one<'a>(
    demographic: &'a CityDemographic,
    income_index: &BTreeMap<JoinKey<'a>, &'a IncomeRecord>,
    crime_index: &BTreeMap<JoinKey<'a>, &'a CrimeRecord>,
) -> Result<JoinedCity<'a>, ExclusionReason> {
    let income = income_index
        .get(&JoinKey::city(&demographic.city, &demographic.state))
        .ok_or(ExclusionReason::NoIncomeMatch)?;
    let (Some(median), Some(avg)) = (income.median_household_income_2020, income.avg_income)
    else {
        return Err(ExclusionReason::MissingIncomeValue);
    };

    let crime = crime_index
        .get(&JoinKey::state(&demographic.state))
        .ok_or(ExclusionReason::NoCrimeMatch)?;
    let rate = crime
        .violent_crime_rate_2020
        .ok_or(ExclusionReason::MissingCrimeValue)?;

    if avg == 0.0 {
        return Err(ExclusionReason::ZeroAverageIncome);
    }
    if !affordability_index(median, avg).is_finite() {
        return Err(ExclusionReason::UnboundedAffordability);
    }

    Ok(JoinedCity {
        demographic,
        median_household_income: median,
        avg_income: avg,
        violent_crime_rate: rate,
    })
}

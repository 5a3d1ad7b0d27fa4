#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the smart-city scoring server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from [`CityRecord`] (whose serde names are the artifact's column names)
//! so the API contract can evolve independently of the file format.

use serde::{Deserialize, Serialize};
use smart_city_city_models::{CityRecord, ScoreWeights, WeightProfile};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Number of cities in the loaded table.
    pub cities: usize,
}

/// A weight triple as exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiWeights {
    /// Safety weight.
    pub safety: f64,
    /// Income weight.
    pub income: f64,
    /// Affordability weight.
    pub affordability: f64,
}

impl From<ScoreWeights> for ApiWeights {
    fn from(w: ScoreWeights) -> Self {
        Self {
            safety: w.safety,
            income: w.income,
            affordability: w.affordability,
        }
    }
}

/// A weight profile as exposed by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProfile {
    /// Profile identifier, usable as the `profile` query parameter.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the profile prioritizes.
    pub description: String,
    /// Default weights.
    pub weights: ApiWeights,
}

impl From<WeightProfile> for ApiProfile {
    fn from(p: WeightProfile) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            weights: p.weights.into(),
        }
    }
}

/// A city as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCity {
    /// City name.
    pub city: String,
    /// State.
    pub state: String,
    /// Population.
    pub population: u64,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Median household income.
    pub median_household_income: f64,
    /// State violent crime rate per 100k.
    pub violent_crime_rate: f64,
    /// Normalized safety (0-1).
    pub safety: f64,
    /// Normalized income (0-1).
    pub income: f64,
    /// Normalized affordability (0-1).
    pub affordability: f64,
    /// Default fixed-weight score.
    pub livability_score: f64,
}

impl From<&CityRecord> for ApiCity {
    fn from(r: &CityRecord) -> Self {
        Self {
            city: r.city.clone(),
            state: r.state.clone(),
            population: r.population,
            lat: r.lat,
            lng: r.lng,
            median_household_income: r.median_household_income_2020,
            violent_crime_rate: r.violent_crime_rate_2020,
            safety: r.safety_index_norm,
            income: r.median_household_income_2020_norm,
            affordability: r.affordability_index_norm,
            livability_score: r.livability_score,
        }
    }
}

/// A ranked city with its user score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiScoredCity {
    /// 1-based rank.
    pub rank: usize,
    /// The city.
    #[serde(flatten)]
    pub city: ApiCity,
    /// Weighted composite score for the requested weights.
    pub user_score: f64,
}

/// Query parameters for the score endpoint.
///
/// Any weight not given falls back to the selected profile's weight, or to
/// an equal share when no profile is selected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreQueryParams {
    /// Safety weight.
    pub safety: Option<f64>,
    /// Income weight.
    pub income: Option<f64>,
    /// Affordability weight.
    pub affordability: Option<f64>,
    /// Profile supplying default weights.
    pub profile: Option<String>,
    /// Number of cities to return.
    pub top_n: Option<usize>,
    /// Return every city instead of the top `topN`.
    pub all: Option<bool>,
}

/// Response of the score endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiScoreResponse {
    /// Normalized weights that were applied.
    pub weights: ApiWeights,
    /// Number of cities in the table.
    pub total: usize,
    /// Ranked cities.
    pub cities: Vec<ApiScoredCity>,
}

/// Error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

//! HTTP handler functions for the scoring API.

use actix_web::{HttpResponse, web};
use smart_city_city_models::ScoreWeights;
use smart_city_scoring::{DEFAULT_TOP_N, rank_by_livability, registry};
use smart_city_server_models::{
    ApiCity, ApiError, ApiHealth, ApiProfile, ApiScoreResponse, ApiScoredCity, ScoreQueryParams,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        cities: state.table.len(),
    })
}

/// `GET /api/profiles`
///
/// Lists the named default weight profiles.
pub async fn profiles() -> HttpResponse {
    let profiles: Vec<ApiProfile> = registry::all_profiles()
        .into_iter()
        .map(ApiProfile::from)
        .collect();
    HttpResponse::Ok().json(profiles)
}

/// `GET /api/cities`
///
/// Returns every city ranked by the default livability score.
pub async fn cities(state: web::Data<AppState>) -> HttpResponse {
    let cities: Vec<ApiCity> = rank_by_livability(&state.table)
        .into_iter()
        .map(ApiCity::from)
        .collect();
    HttpResponse::Ok().json(cities)
}

/// `GET /api/score`
///
/// Ranks cities by `UserScore` for the requested weights.
pub async fn score(
    state: web::Data<AppState>,
    params: web::Query<ScoreQueryParams>,
) -> HttpResponse {
    let weights = match resolve_weights(&params) {
        Ok(w) => w,
        Err(message) => {
            return HttpResponse::BadRequest().json(ApiError { error: message });
        }
    };

    let top_n = params.top_n.unwrap_or(DEFAULT_TOP_N);
    let ranking = smart_city_scoring::score(&state.table, weights, top_n);

    let selected = if params.all.unwrap_or(false) {
        ranking.ranked()
    } else {
        ranking.top()
    };

    let cities: Vec<ApiScoredCity> = selected
        .iter()
        .enumerate()
        .map(|(i, scored)| ApiScoredCity {
            rank: i + 1,
            city: ApiCity::from(scored.record),
            user_score: scored.user_score,
        })
        .collect();

    HttpResponse::Ok().json(ApiScoreResponse {
        weights: ranking.weights().weights().into(),
        total: state.table.len(),
        cities,
    })
}

/// Combines explicit weights with the selected profile's defaults.
///
/// Without a profile, unspecified weights default to `1.0` so that an empty
/// query ranks by the unweighted average.
fn resolve_weights(params: &ScoreQueryParams) -> Result<ScoreWeights, String> {
    let defaults = match params.profile.as_deref() {
        Some(id) => {
            registry::profile(id)
                .ok_or_else(|| format!("Unknown profile '{id}'"))?
                .weights
        }
        None => ScoreWeights::new(1.0, 1.0, 1.0),
    };

    Ok(ScoreWeights::new(
        params.safety.unwrap_or(defaults.safety),
        params.income.unwrap_or(defaults.income),
        params.affordability.unwrap_or(defaults.affordability),
    ))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{RecommendationRequest, RecommendationResponse},
};

use super::AppState;

/// Health check endpoint, with a summary of the loaded catalog
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let catalog = state.recommender.catalog();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "movies": catalog.len(),
            "genres": catalog.all_genres().len(),
            "loaded_at": state.loaded_at,
        })),
    )
}

/// All genres in the catalog, sorted
pub async fn get_genres(State(state): State<AppState>) -> Json<Vec<String>> {
    let genres: Vec<String> = state
        .recommender
        .catalog()
        .all_genres()
        .iter()
        .cloned()
        .collect();
    Json(genres)
}

/// Titles in a genre, sorted and de-duplicated, for seed selection
pub async fn get_genre_titles(
    State(state): State<AppState>,
    Path(genre): Path<String>,
) -> Json<Vec<String>> {
    let titles: Vec<String> = state
        .recommender
        .catalog()
        .titles_in_genre(&genre)
        .into_iter()
        .map(str::to_string)
        .collect();
    Json(titles)
}

/// Genre-only or genre+seed recommendations
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let genre = request.genre.trim();
    if genre.is_empty() {
        return Err(AppError::InvalidInput("genre is required".to_string()));
    }

    let count = request.count.unwrap_or(state.limits.default_count);
    if count == 0 || count > state.limits.max_count {
        return Err(AppError::InvalidInput(format!(
            "count must be between 1 and {}",
            state.limits.max_count
        )));
    }

    let seed = request
        .seed
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    tracing::info!(
        request_id = %request_id,
        genre = %genre,
        seed = ?seed,
        count,
        "Processing recommendation request"
    );

    let results = state.recommender.recommend(genre, seed, count)?;

    tracing::info!(
        request_id = %request_id,
        returned = results.len(),
        "Recommendations completed"
    );

    Ok(Json(RecommendationResponse {
        genre: genre.to_string(),
        seed: seed.map(str::to_string),
        results,
    }))
}

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::{Json as JsonBody, Path, Query};
use super::AppState;
use crate::error::AppResult;
use crate::middleware::request_id::RequestId;
use crate::models::{
    CatalogAnalytics, RecommendationRequest, RecommendationResult, Title, TitleId, TitleType,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    title_type: Option<TitleType>,
    language: Option<String>,
    limit: Option<usize>,
}

/// Health check endpoint; reports whether the model bundle is resident
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "models_loaded": state.recommender.is_ready(),
            "loaded_at": state.recommender.loaded_at(),
        })),
    )
}

/// Handler for title search endpoint
pub async fn search_titles(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<Title>>> {
    let titles = state
        .recommender
        .search_titles(&params.q, params.limit)
        .await?;
    Ok(Json(titles))
}

/// Handler for trending titles endpoint
pub async fn trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingQuery>,
) -> AppResult<Json<Vec<Title>>> {
    let titles = state
        .recommender
        .trending(params.title_type, params.language.as_deref(), params.limit)
        .await?;
    Ok(Json(titles))
}

/// Handler for title details endpoint
pub async fn get_title(
    State(state): State<AppState>,
    Path(id): Path<TitleId>,
) -> AppResult<Json<Title>> {
    let title = state.recommender.title_details(id).await?;
    Ok(Json(title))
}

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    JsonBody(request): JsonBody<RecommendationRequest>,
) -> AppResult<Json<RecommendationResult>> {
    tracing::info!(
        request_id = %request_id,
        title_id = ?request.title_id,
        user_id = ?request.user_id,
        method = ?request.method,
        k = ?request.k,
        "Processing recommendation request"
    );

    let result = state.recommender.recommend(&request).await.map_err(|e| {
        tracing::warn!(request_id = %request_id, error = %e, "Recommendation request failed");
        e
    })?;

    tracing::info!(
        request_id = %request_id,
        returned = result.items.len(),
        "Recommendation completed"
    );

    Ok(Json(result))
}

/// Handler for catalog analytics endpoint
pub async fn analytics(State(state): State<AppState>) -> AppResult<Json<CatalogAnalytics>> {
    let analytics = state.recommender.analytics().await?;
    Ok(Json(analytics))
}

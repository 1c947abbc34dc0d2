use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::error::ApiError;
use super::server::AppState;
use crate::search::{SearchPage, SearchRequest};

/// POST /api/search
///
/// Responds with the primary index page exactly as the index sent it on a
/// hit, otherwise with the backend results wrapped in the same envelope shape.
pub async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchPage>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let params = request.validate()?;

    tracing::info!(
        query = %params.query,
        media_type = %params.media_type,
        page = params.page,
        per_page = params.per_page,
        "Search request"
    );

    let response = state.pipeline.execute(&params).await?;
    Ok(Json(response.page))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "primary_index": state.pipeline.primary_enabled(),
    }))
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

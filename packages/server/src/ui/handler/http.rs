//! Diagnostics HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    infrastructure::dto::http::{ChannelDetailDto, ChannelSummaryDto},
    ui::state::AppState,
    usecase::GetChannelDetailError,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of live channels
pub async fn get_channels(State(state): State<Arc<AppState>>) -> Json<Vec<ChannelSummaryDto>> {
    let channels = state.get_channels_usecase.execute().await;

    // Domain Model から DTO への変換
    Json(channels.into_iter().map(ChannelSummaryDto::from).collect())
}

/// Get live channel detail by movie id
pub async fn get_channel_detail(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
) -> Result<Json<ChannelDetailDto>, StatusCode> {
    match state.get_channel_detail_usecase.execute(movie_id).await {
        Ok(detail) => Ok(Json(detail.into())),
        Err(GetChannelDetailError::ChannelNotFound) => Err(StatusCode::NOT_FOUND),
        Err(GetChannelDetailError::InvalidMovieId) => Err(StatusCode::BAD_REQUEST),
    }
}

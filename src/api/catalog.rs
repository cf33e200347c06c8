use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, ProfileDto, StatusDto};

/// GET /statuses
pub async fn list_statuses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<StatusDto>>>, ApiError> {
    let statuses = state.store().list_statuses().await?;
    Ok(Json(ApiResponse::success(
        statuses.into_iter().map(StatusDto::from).collect(),
    )))
}

/// GET /profiles
pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<ProfileDto>>>, ApiError> {
    let profiles = state.store().list_profiles().await?;
    Ok(Json(ApiResponse::success(
        profiles.into_iter().map(ProfileDto::from).collect(),
    )))
}

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::RequestContext;
use super::validation::{require_text, validate_email, validate_id};
use super::{AgencyDto, ApiError, ApiResponse, AppState, MessageResponse};
use crate::db::AgencyInput;

#[derive(Debug, Deserialize)]
pub struct AgencyRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl AgencyRequest {
    fn validate(self) -> Result<AgencyInput, ApiError> {
        Ok(AgencyInput {
            name: require_text("Name", &self.name)?,
            email: validate_email(&self.email)?,
            phone: require_text("Phone", &self.phone)?,
        })
    }
}

/// GET /agencies
pub async fn list_agencies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<AgencyDto>>>, ApiError> {
    let agencies = state.store().list_agencies().await?;
    Ok(Json(ApiResponse::success(
        agencies.into_iter().map(AgencyDto::from).collect(),
    )))
}

/// GET /agencies/{id}
pub async fn get_agency(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AgencyDto>>, ApiError> {
    let id = validate_id("Agency", id)?;
    let agency = state
        .store()
        .get_agency(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Agency", id))?;

    Ok(Json(ApiResponse::success(AgencyDto::from(agency))))
}

/// POST /agencies
pub async fn create_agency(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<AgencyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AgencyDto>>), ApiError> {
    ctx.require_staff()?;
    let input = payload.validate()?;

    let agency = state.store().create_agency(input).await?;
    tracing::info!(agency_id = agency.id, actor_id = ctx.user_id, "Agency created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AgencyDto::from(agency))),
    ))
}

/// PUT /agencies/{id}
pub async fn update_agency(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i32>,
    Json(payload): Json<AgencyRequest>,
) -> Result<Json<ApiResponse<AgencyDto>>, ApiError> {
    ctx.require_staff()?;
    let id = validate_id("Agency", id)?;
    let input = payload.validate()?;

    let agency = state
        .store()
        .update_agency(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("Agency", id))?;

    Ok(Json(ApiResponse::success(AgencyDto::from(agency))))
}

/// DELETE /agencies/{id}
/// Occurrences assigned to the agency become unassigned
pub async fn delete_agency(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    ctx.require_staff()?;
    let id = validate_id("Agency", id)?;

    if !state.store().delete_agency(id).await? {
        return Err(ApiError::not_found("Agency", id));
    }

    tracing::info!(agency_id = id, actor_id = ctx.user_id, "Agency deleted");

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Agency deleted",
    ))))
}

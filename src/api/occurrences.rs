use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::RequestContext;
use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, MessageResponse, NotificationDto, OccurrenceDto};
use crate::services::{CreateOccurrence, ImageUpload, OccurrenceError, UpdateOccurrence};

impl From<OccurrenceError> for ApiError {
    fn from(err: OccurrenceError) -> Self {
        match err {
            OccurrenceError::NotFound(id) => Self::not_found("Occurrence", id),
            OccurrenceError::StatusNotFound(status) => Self::not_found("Status", status),
            OccurrenceError::AgencyNotFound(id) => Self::not_found("Agency", id),
            OccurrenceError::Validation(msg) | OccurrenceError::Image(msg) => Self::validation(msg),
            OccurrenceError::Database(msg) => Self::DatabaseError(msg),
            OccurrenceError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListOccurrencesQuery {
    pub status_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOccurrenceRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub status_id: i32,
    #[serde(default, alias = "justification")]
    pub rejection_justification: Option<String>,
    /// Absent or null unassigns the agency.
    #[serde(default)]
    pub agency_id: Option<i32>,
}

/// POST /occurrences
///
/// Multipart form with `title`, `address`, `description`, `latitude`,
/// `longitude` and any number of `images` file parts.
pub async fn create_occurrence(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<OccurrenceDto>>), ApiError> {
    let mut input = CreateOccurrence::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "images" || name == "images[]" {
            let filename = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(format!("Failed to read upload: {e}")))?;

            // Browsers send an empty part when no file was picked.
            if bytes.is_empty() && filename.as_deref().is_none_or(str::is_empty) {
                continue;
            }

            input.images.push(ImageUpload {
                filename,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::validation(format!("Invalid field '{name}': {e}")))?;

        match name.as_str() {
            "title" => input.title = value,
            "description" => input.description = value,
            "address" => input.address = value,
            "latitude" => input.latitude = Some(value),
            "longitude" => input.longitude = Some(value),
            _ => tracing::debug!(field = %name, "Ignoring unknown occurrence form field"),
        }
    }

    let occurrence = state
        .occurrence_service()
        .create(ctx.user_id, input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(OccurrenceDto::from(occurrence))),
    ))
}

/// GET /occurrences
pub async fn list_occurrences(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListOccurrencesQuery>,
) -> Result<Json<ApiResponse<Vec<OccurrenceDto>>>, ApiError> {
    ctx.require_staff()?;

    let occurrences = state.occurrence_service().list(query.status_id).await?;

    Ok(Json(ApiResponse::success(
        occurrences.into_iter().map(OccurrenceDto::from).collect(),
    )))
}

/// GET /occurrences/active
/// Registered and in-progress occurrences with coordinates, for the map view
pub async fn list_active(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<OccurrenceDto>>>, ApiError> {
    let occurrences = state.occurrence_service().list_active().await?;

    Ok(Json(ApiResponse::success(
        occurrences.into_iter().map(OccurrenceDto::from).collect(),
    )))
}

/// GET /occurrences/mine
pub async fn list_mine(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ApiResponse<Vec<OccurrenceDto>>>, ApiError> {
    let occurrences = state
        .occurrence_service()
        .list_for_reporter(ctx.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        occurrences.into_iter().map(OccurrenceDto::from).collect(),
    )))
}

/// GET /occurrences/{id}
pub async fn get_occurrence(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<OccurrenceDto>>, ApiError> {
    let id = validate_id("Occurrence", id)?;
    let occurrence = state.occurrence_service().get(id).await?;
    Ok(Json(ApiResponse::success(OccurrenceDto::from(occurrence))))
}

/// PUT /occurrences/{id}
/// Edits the occurrence and runs the status transition
pub async fn update_occurrence(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOccurrenceRequest>,
) -> Result<Json<ApiResponse<OccurrenceDto>>, ApiError> {
    ctx.require_staff()?;
    let id = validate_id("Occurrence", id)?;
    let status_id = validate_id("Status", payload.status_id)?;

    let occurrence = state
        .occurrence_service()
        .update(
            id,
            UpdateOccurrence {
                title: payload.title,
                description: payload.description,
                address: payload.address,
                status_id,
                rejection_justification: payload.rejection_justification,
                agency_id: payload.agency_id,
            },
        )
        .await?;

    tracing::info!(occurrence_id = id, actor_id = ctx.user_id, "Occurrence updated");

    Ok(Json(ApiResponse::success(OccurrenceDto::from(occurrence))))
}

/// DELETE /occurrences/{id}
pub async fn delete_occurrence(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    ctx.require_staff()?;
    let id = validate_id("Occurrence", id)?;

    state.occurrence_service().delete(id).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Occurrence deleted",
    ))))
}

/// GET /occurrences/{id}/notifications
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<NotificationDto>>>, ApiError> {
    ctx.require_staff()?;
    let id = validate_id("Occurrence", id)?;

    let notifications = state.occurrence_service().notifications(id).await?;

    Ok(Json(ApiResponse::success(
        notifications.into_iter().map(NotificationDto::from).collect(),
    )))
}

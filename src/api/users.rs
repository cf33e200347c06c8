use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::RequestContext;
use super::validation::{validate_id, validate_search_query};
use super::{ApiError, ApiResponse, AppState, MessageResponse, RankingEntryDto, UserDto};
use crate::services::{AdminUserUpdate, ProfileUpdate, UserError};

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(id) => Self::not_found("User", id),
            UserError::ProfileNotFound(id) => Self::not_found("Profile", id),
            UserError::EmailTaken => Self::conflict("Email already registered"),
            UserError::SelfDeletion => Self::validation("You cannot delete your own account"),
            UserError::HasOccurrences(count) => Self::conflict(format!(
                "User still owns {count} occurrence(s) and cannot be deleted"
            )),
            UserError::Validation(msg) => Self::validation(msg),
            UserError::Database(msg) => Self::DatabaseError(msg),
            UserError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
    #[serde(default)]
    pub confirm_new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub profile_id: i32,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// GET /users/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state.user_service().get(ctx.user_id).await?;
    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// PUT /users/me
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .user_service()
        .update_profile(
            ctx.user_id,
            ProfileUpdate {
                name: payload.name,
                phone: payload.phone,
                avatar_url: payload.avatar_url,
                new_password: payload.new_password,
                confirm_new_password: payload.confirm_new_password,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// GET /users?search=
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    ctx.require_admin()?;

    let users = state
        .user_service()
        .list(validate_search_query(query.search.as_deref()))
        .await?;

    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

/// PUT /users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i32>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    ctx.require_admin()?;
    let id = validate_id("User", id)?;

    let user = state
        .user_service()
        .update_user(
            id,
            AdminUserUpdate {
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
                profile_id: payload.profile_id,
                new_password: payload.new_password,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    ctx.require_admin()?;
    let id = validate_id("User", id)?;

    state.user_service().delete_user(ctx.user_id, id).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new("User deleted"))))
}

/// GET /ranking
pub async fn get_ranking(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<RankingEntryDto>>>, ApiError> {
    let users = state.user_service().ranking().await?;

    let entries = users
        .into_iter()
        .enumerate()
        .map(|(index, user)| RankingEntryDto {
            position: index + 1,
            user_id: user.id,
            name: user.name,
            avatar_url: user.avatar_url,
            points: user.points,
        })
        .collect();

    Ok(Json(ApiResponse::success(entries)))
}

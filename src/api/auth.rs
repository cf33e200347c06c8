use axum::{
    Extension, Json,
    extract::{Path, Request, State},
    middleware::Next,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::validation::{normalize_phone, require_text, validate_email};
use super::{ApiError, ApiResponse, AppState, MessageResponse, UserDto};
use crate::domain::Role;
use crate::services::{AuthError, Registration};

/// Session key holding the authenticated user id.
pub const SESSION_USER_KEY: &str = "user_id";

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::unauthorized("Invalid credentials"),
            AuthError::AccountBlocked => Self::forbidden(
                "Your account is blocked after repeated rejected occurrences",
            ),
            AuthError::EmailTaken => Self::conflict("Email already registered"),
            AuthError::UserNotFound => Self::unauthorized("User not found"),
            AuthError::InvalidResetToken => Self::validation("Invalid or expired reset link"),
            AuthError::Validation(msg) => Self::validation(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

// ============================================================================
// Request context
// ============================================================================

/// Identity of the caller, resolved once per request by [`auth_middleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: i32,
    pub role: Role,
}

impl RequestContext {
    /// Fails with 403 unless the caller holds one of `roles`.
    pub fn require_any(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "You do not have permission to perform this action",
            ))
        }
    }

    pub fn require_staff(&self) -> Result<(), ApiError> {
        self.require_any(&Role::STAFF)
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require_any(&[Role::Administrator])
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    #[serde(default)]
    pub surname: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user_id: i32,
    pub name: String,
    pub profile: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
    pub confirm_new_password: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolves the session user, rejects blocked accounts and attaches a
/// [`RequestContext`] to the request.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = session
        .get::<i32>(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    let Some(user) = state.store().get_user(user_id).await? else {
        let _ = session.flush().await;
        return Err(ApiError::unauthorized("Not authenticated"));
    };

    if user.is_blocked {
        let _ = session.flush().await;
        tracing::warn!(user_id, "Rejected request from blocked account");
        return Err(AuthError::AccountBlocked.into());
    }

    tracing::Span::current().record("user_id", user_id);

    request.extensions_mut().insert(RequestContext {
        user_id,
        role: user.role,
    });

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let name = require_text("Name", &payload.name)?;
    let email = validate_email(&payload.email)?;
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let user = state
        .auth_service()
        .register(Registration {
            name,
            surname: payload.surname,
            email,
            phone: normalize_phone(payload.phone),
            password: payload.password,
            confirm_password: payload.confirm_password,
        })
        .await?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// POST /auth/login
/// Authenticate with email and password and open a session
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if payload.email.trim().is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let user = state
        .auth_service()
        .login(&payload.email, &payload.password)
        .await?;

    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
    session
        .insert(SESSION_USER_KEY, user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(ApiResponse::success(LoginResponse {
        user_id: user.id,
        name: user.name,
        profile: user.role.name().to_string(),
    })))
}

/// POST /auth/logout
/// Invalidate the current session
pub async fn logout(session: Session) -> Json<ApiResponse<MessageResponse>> {
    let _ = session.flush().await;
    Json(ApiResponse::success(MessageResponse::new("Logged out")))
}

/// GET /auth/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state.auth_service().current_user(ctx.user_id).await?;
    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// POST /auth/forgot-password
/// Always answers with the same message so accounts cannot be enumerated
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = require_text("Email", &payload.email)?;

    state.auth_service().forgot_password(&email).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "If the email is registered, a reset link has been sent",
    ))))
}

/// POST /auth/reset-password/{token}
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth_service()
        .reset_password(
            token.trim(),
            &payload.new_password,
            &payload.confirm_new_password,
        )
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}

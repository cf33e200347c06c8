use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

use crate::config::Config;
use crate::services::{AuthService, ImageStorage, Mailer, OccurrenceService, UserService};
use crate::state::SharedState;

mod agencies;
pub mod auth;
mod catalog;
mod error;
mod observability;
mod occurrences;
mod system;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;

/// Upper bound on the number of full-size images in one multipart body.
const MAX_IMAGES_PER_REQUEST: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<ImageStorage> {
        &self.shared.storage
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn user_service(&self) -> &Arc<dyn UserService> {
        &self.shared.user_service
    }

    #[must_use]
    pub fn occurrence_service(&self) -> &Arc<dyn OccurrenceService> {
        &self.shared.occurrence_service
    }
}

pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

/// Same as [`create_app_state_from_config`] with an explicit mail transport.
pub async fn create_app_state_with_mailer(
    config: Config,
    mailer: Arc<dyn Mailer>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::with_mailer(config, mailer).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let config = state.config().read().await.clone();

    let upload_limit = config
        .uploads
        .max_file_size_bytes()
        .saturating_mul(MAX_IMAGES_PER_REQUEST);

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.server.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.server.session_inactivity_minutes,
        )));

    let api_router = Router::new()
        .merge(create_protected_router(state.clone(), upload_limit))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password/{token}", post(auth::reset_password))
        .route("/system/health", get(system::health))
        .route("/statuses", get(catalog::list_statuses))
        .layer(session_layer)
        .with_state(state);

    let cors_origins = &config.server.cors_allowed_origins;
    let cors_layer = if cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(true)
    };

    Router::new()
        .nest("/api", api_router)
        .nest_service(
            &config.uploads.public_prefix,
            ServeDir::new(&config.uploads.path),
        )
        .layer(
            cors_layer
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request()),
        )
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>, upload_limit: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/users/me", get(users::get_me).put(users::update_me))
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            put(users::update_user).delete(users::delete_user),
        )
        .route("/ranking", get(users::get_ranking))
        .route(
            "/occurrences",
            get(occurrences::list_occurrences)
                .post(occurrences::create_occurrence)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/occurrences/active", get(occurrences::list_active))
        .route("/occurrences/mine", get(occurrences::list_mine))
        .route(
            "/occurrences/{id}",
            get(occurrences::get_occurrence)
                .put(occurrences::update_occurrence)
                .delete(occurrences::delete_occurrence),
        )
        .route(
            "/occurrences/{id}/notifications",
            get(occurrences::list_notifications),
        )
        .route(
            "/agencies",
            get(agencies::list_agencies).post(agencies::create_agency),
        )
        .route(
            "/agencies/{id}",
            get(agencies::get_agency)
                .put(agencies::update_agency)
                .delete(agencies::delete_agency),
        )
        .route("/profiles", get(catalog::list_profiles))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

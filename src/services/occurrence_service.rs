//! Domain service for occurrences: creation, triage and the status lifecycle.

use thiserror::Error;

use crate::db::{Notification, Occurrence};
use crate::domain::TransitionError;
use crate::services::storage::{ImageUpload, StorageError};

#[derive(Debug, Error)]
pub enum OccurrenceError {
    #[error("Occurrence not found: {0}")]
    NotFound(i32),

    #[error("Status not found: {0}")]
    StatusNotFound(String),

    #[error("Agency not found: {0}")]
    AgencyNotFound(i32),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Image rejected: {0}")]
    Image(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for OccurrenceError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for OccurrenceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<TransitionError> for OccurrenceError {
    fn from(err: TransitionError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StorageError> for OccurrenceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => Self::Internal(format!("Failed to store image: {e}")),
            other => Self::Image(other.to_string()),
        }
    }
}

/// Raw creation form. Coordinates arrive as text from the multipart body.
#[derive(Debug, Clone, Default)]
pub struct CreateOccurrence {
    pub title: String,
    pub description: String,
    pub address: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub images: Vec<ImageUpload>,
}

/// Staff edit of an occurrence.
#[derive(Debug, Clone)]
pub struct UpdateOccurrence {
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub status_id: i32,
    pub rejection_justification: Option<String>,
    /// `None` unassigns the agency.
    pub agency_id: Option<i32>,
}

#[async_trait::async_trait]
pub trait OccurrenceService: Send + Sync {
    /// Registers an occurrence for `reporter_id` in the configured initial status.
    async fn create(
        &self,
        reporter_id: i32,
        input: CreateOccurrence,
    ) -> Result<Occurrence, OccurrenceError>;

    async fn get(&self, id: i32) -> Result<Occurrence, OccurrenceError>;

    /// All occurrences, optionally restricted to one status id.
    async fn list(&self, status_id: Option<i32>) -> Result<Vec<Occurrence>, OccurrenceError>;

    /// Registered or in-progress occurrences that carry coordinates.
    async fn list_active(&self) -> Result<Vec<Occurrence>, OccurrenceError>;

    async fn list_for_reporter(&self, user_id: i32) -> Result<Vec<Occurrence>, OccurrenceError>;

    /// Applies field edits, the agency assignment and the status transition.
    ///
    /// # Errors
    ///
    /// Returns [`OccurrenceError::Validation`] when rejecting without a
    /// justification; nothing is persisted in that case.
    async fn update(
        &self,
        id: i32,
        input: UpdateOccurrence,
    ) -> Result<Occurrence, OccurrenceError>;

    async fn delete(&self, id: i32) -> Result<(), OccurrenceError>;

    async fn notifications(&self, id: i32) -> Result<Vec<Notification>, OccurrenceError>;
}

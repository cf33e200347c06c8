//! Domain service for account profiles, administration and the ranking.

use thiserror::Error;

use crate::db::User;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(i32),

    #[error("Profile not found: {0}")]
    ProfileNotFound(i32),

    #[error("Email already registered")]
    EmailTaken,

    #[error("You cannot delete your own account")]
    SelfDeletion,

    #[error("User still owns {0} occurrence(s)")]
    HasOccurrences(u64),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Self-service profile edit. Empty `phone` or `avatar_url` clears the value.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub new_password: Option<String>,
    pub confirm_new_password: Option<String>,
}

/// Administrator edit of another account.
#[derive(Debug, Clone)]
pub struct AdminUserUpdate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub profile_id: i32,
    pub new_password: Option<String>,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn get(&self, user_id: i32) -> Result<User, UserError>;

    async fn update_profile(&self, user_id: i32, update: ProfileUpdate)
    -> Result<User, UserError>;

    /// Lists accounts, optionally filtered by a name/email substring.
    async fn list(&self, search: Option<&str>) -> Result<Vec<User>, UserError>;

    async fn update_user(&self, id: i32, update: AdminUserUpdate) -> Result<User, UserError>;

    /// Deletes an account on behalf of `actor_id`.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::SelfDeletion`] when `actor_id == id` and
    /// [`UserError::HasOccurrences`] when the account still owns occurrences.
    async fn delete_user(&self, actor_id: i32, id: i32) -> Result<(), UserError>;

    /// Top non-blocked users by point balance.
    async fn ranking(&self) -> Result<Vec<User>, UserError>;
}

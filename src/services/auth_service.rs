//! Domain service for authentication, registration and password recovery.

use thiserror::Error;

use crate::config::BootstrapConfig;
use crate::db::User;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is blocked")]
    AccountBlocked,

    #[error("Email already registered")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub surname: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

/// Checks a new password against the configured policy.
///
/// # Errors
///
/// Returns a user-facing message when the passwords differ or the password is
/// shorter than `min_length` characters.
pub fn check_password_policy(
    password: &str,
    confirmation: &str,
    min_length: usize,
) -> Result<(), String> {
    if password != confirmation {
        return Err("Passwords do not match".to_string());
    }
    if password.chars().count() < min_length {
        return Err(format!(
            "Password must be at least {min_length} characters"
        ));
    }
    Ok(())
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates a `Usuario` account with zero points.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailTaken`] if the email is registered and
    /// [`AuthError::Validation`] if the password violates the policy.
    async fn register(&self, registration: Registration) -> Result<User, AuthError>;

    /// Verifies credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails and
    /// [`AuthError::AccountBlocked`] for blocked accounts.
    async fn login(&self, email: &str, password: &str) -> Result<User, AuthError>;

    /// Loads the user bound to a session.
    async fn current_user(&self, user_id: i32) -> Result<User, AuthError>;

    /// Issues a reset token and mails the reset link. Unknown emails are ignored.
    async fn forgot_password(&self, email: &str) -> Result<(), AuthError>;

    /// Redeems a reset token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidResetToken`] for unknown, used or expired
    /// tokens.
    async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), AuthError>;

    /// Creates an `Administrador` account.
    async fn create_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError>;

    /// Creates the bootstrap administrator when no administrator exists.
    /// Returns the account if one was created.
    async fn ensure_default_admin(
        &self,
        bootstrap: &BootstrapConfig,
    ) -> Result<Option<User>, AuthError>;
}

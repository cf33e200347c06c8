//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::{BootstrapConfig, Config};
use crate::db::{NewUser, Redemption, Store, User};
use crate::domain::Role;
use crate::services::auth_service::{AuthError, AuthService, Registration, check_password_policy};
use crate::services::mailer::{Mailer, templates};

pub struct SeaOrmAuthService {
    store: Store,
    config: Arc<RwLock<Config>>,
    mailer: Arc<dyn Mailer>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, config: Arc<RwLock<Config>>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            config,
            mailer,
        }
    }

    async fn create_account(
        &self,
        name: String,
        email: String,
        phone: Option<String>,
        password: String,
        role: Role,
    ) -> Result<User, AuthError> {
        if self.store.email_in_use(&email, None).await? {
            return Err(AuthError::EmailTaken);
        }

        let security = self.config.read().await.security.clone();
        let user = self
            .store
            .create_user(
                NewUser {
                    name,
                    email,
                    phone,
                    password,
                    role,
                },
                &security,
            )
            .await?;

        info!(user_id = user.id, role = %user.role, "Account created");
        Ok(user)
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        let min_length = self.config.read().await.security.password_min_length;
        check_password_policy(
            &registration.password,
            &registration.confirm_password,
            min_length,
        )
        .map_err(AuthError::Validation)?;

        let name = match registration.surname.as_deref().map(str::trim) {
            Some(surname) if !surname.is_empty() => {
                format!("{} {}", registration.name.trim(), surname)
            }
            _ => registration.name.trim().to_string(),
        };

        self.create_account(
            name,
            registration.email.trim().to_lowercase(),
            registration.phone,
            registration.password,
            Role::User,
        )
        .await
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .store
            .verify_credentials(&email.trim().to_lowercase(), password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if user.is_blocked {
            warn!(user_id = user.id, "Blocked account attempted to log in");
            return Err(AuthError::AccountBlocked);
        }

        Ok(user)
    }

    async fn current_user(&self, user_id: i32) -> Result<User, AuthError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = self
            .store
            .get_user_by_email(&email.trim().to_lowercase())
            .await?
        else {
            info!("Password reset requested for unknown email");
            return Ok(());
        };

        let (ttl_minutes, base_url) = {
            let config = self.config.read().await;
            (
                config.security.reset_token_ttl_minutes,
                config.mail.reset_base_url.clone(),
            )
        };

        let expires_at = Utc::now() + Duration::minutes(ttl_minutes);
        let token = self.store.issue_reset_token(user.id, expires_at).await?;
        let link = format!("{}/{}", base_url.trim_end_matches('/'), token);

        let mail = templates::password_reset(&user.name, &link, ttl_minutes);
        if let Err(e) = self.mailer.send(&user.email, &mail).await {
            warn!(user_id = user.id, error = %e, "Failed to send password reset email");
            metrics::counter!("notification_failures_total", "kind" => "password_reset")
                .increment(1);
        } else {
            info!(user_id = user.id, "Password reset email sent");
        }

        Ok(())
    }

    async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), AuthError> {
        let now = Utc::now();
        if !self.store.is_reset_token_valid(token, now).await? {
            return Err(AuthError::InvalidResetToken);
        }

        let security = self.config.read().await.security.clone();
        check_password_policy(new_password, confirmation, security.password_min_length)
            .map_err(AuthError::Validation)?;

        match self
            .store
            .redeem_reset_token(token, new_password, now, &security)
            .await?
        {
            Redemption::Redeemed { user_id } => {
                info!(user_id, "Password reset completed");
                Ok(())
            }
            Redemption::Invalid => Err(AuthError::InvalidResetToken),
        }
    }

    async fn create_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let min_length = self.config.read().await.security.password_min_length;
        check_password_policy(password, password, min_length).map_err(AuthError::Validation)?;

        self.create_account(
            name.trim().to_string(),
            email.trim().to_lowercase(),
            None,
            password.to_string(),
            Role::Administrator,
        )
        .await
    }

    async fn ensure_default_admin(
        &self,
        bootstrap: &BootstrapConfig,
    ) -> Result<Option<User>, AuthError> {
        if self.store.has_user_with_role(Role::Administrator).await? {
            return Ok(None);
        }

        let email = bootstrap.admin_email.trim().to_lowercase();
        if self.store.email_in_use(&email, None).await? {
            warn!(
                email = %email,
                "Bootstrap administrator email belongs to a non-admin account, skipping"
            );
            return Ok(None);
        }

        let user = self
            .create_admin(
                &bootstrap.admin_name,
                &bootstrap.admin_email,
                &bootstrap.admin_password,
            )
            .await?;

        info!(email = %user.email, "Created bootstrap administrator");
        Ok(Some(user))
    }
}

//! `SeaORM` implementation of the `UserService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::db::{Store, User, UserChanges};
use crate::domain::{FieldChange, Role};
use crate::services::auth_service::check_password_policy;
use crate::services::user_service::{AdminUserUpdate, ProfileUpdate, UserError, UserService};

pub struct SeaOrmUserService {
    store: Store,
    config: Arc<RwLock<Config>>,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store, config: Arc<RwLock<Config>>) -> Self {
        Self { store, config }
    }
}

/// Maps an optional form value onto a nullable column edit.
fn optional_text(value: Option<String>) -> FieldChange<String> {
    match value.map(|v| v.trim().to_string()) {
        None => FieldChange::Keep,
        Some(v) if v.is_empty() => FieldChange::Clear,
        Some(v) => FieldChange::Set(v),
    }
}

fn required_text(field: &str, value: &str) -> Result<String, UserError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(UserError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn get(&self, user_id: i32) -> Result<User, UserError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(UserError::NotFound(user_id))
    }

    async fn update_profile(
        &self,
        user_id: i32,
        update: ProfileUpdate,
    ) -> Result<User, UserError> {
        let security = self.config.read().await.security.clone();

        let name = match update.name {
            Some(name) => Some(required_text("Name", &name)?),
            None => None,
        };

        let password = match update.new_password.filter(|p| !p.is_empty()) {
            Some(password) => {
                let confirmation = update.confirm_new_password.unwrap_or_default();
                check_password_policy(&password, &confirmation, security.password_min_length)
                    .map_err(UserError::Validation)?;
                Some(password)
            }
            None => None,
        };

        let changes = UserChanges {
            name,
            phone: optional_text(update.phone),
            avatar_url: optional_text(update.avatar_url),
            password,
            ..UserChanges::default()
        };

        let user = self
            .store
            .update_user(user_id, changes, &security)
            .await?
            .ok_or(UserError::NotFound(user_id))?;

        info!(user_id, "Profile updated");
        Ok(user)
    }

    async fn list(&self, search: Option<&str>) -> Result<Vec<User>, UserError> {
        Ok(self.store.list_users(search).await?)
    }

    async fn update_user(&self, id: i32, update: AdminUserUpdate) -> Result<User, UserError> {
        let security = self.config.read().await.security.clone();

        if self.store.get_user(id).await?.is_none() {
            return Err(UserError::NotFound(id));
        }

        let name = required_text("Name", &update.name)?;
        let email = required_text("Email", &update.email)?.to_lowercase();
        if self.store.email_in_use(&email, Some(id)).await? {
            return Err(UserError::EmailTaken);
        }

        let profile = self
            .store
            .get_profile(update.profile_id)
            .await?
            .ok_or(UserError::ProfileNotFound(update.profile_id))?;
        let role = Role::from_name(&profile.name)
            .ok_or(UserError::ProfileNotFound(update.profile_id))?;

        let password = match update.new_password.filter(|p| !p.is_empty()) {
            Some(password) => {
                check_password_policy(&password, &password, security.password_min_length)
                    .map_err(UserError::Validation)?;
                Some(password)
            }
            None => None,
        };

        let changes = UserChanges {
            name: Some(name),
            email: Some(email),
            phone: optional_text(update.phone),
            role: Some(role),
            password,
            ..UserChanges::default()
        };

        let user = self
            .store
            .update_user(id, changes, &security)
            .await?
            .ok_or(UserError::NotFound(id))?;

        info!(user_id = id, role = %user.role, "User updated by administrator");
        Ok(user)
    }

    async fn delete_user(&self, actor_id: i32, id: i32) -> Result<(), UserError> {
        if actor_id == id {
            return Err(UserError::SelfDeletion);
        }

        if self.store.get_user(id).await?.is_none() {
            return Err(UserError::NotFound(id));
        }

        let owned = self.store.count_user_occurrences(id).await?;
        if owned > 0 {
            return Err(UserError::HasOccurrences(owned));
        }

        if !self.store.delete_user(id).await? {
            return Err(UserError::NotFound(id));
        }

        info!(user_id = id, actor_id, "User deleted");
        Ok(())
    }

    async fn ranking(&self) -> Result<Vec<User>, UserError> {
        let size = self.config.read().await.ranking.size;
        Ok(self.store.ranking(size).await?)
    }
}

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::domain::{FieldChange, Reputation, Role};
use crate::entities::{occurrences, profiles, users};

/// Avatar assigned to accounts that never uploaded one.
pub const DEFAULT_AVATAR_URL: &str = "/avatar.svg";

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub profile_id: i32,
    pub role: Role,
    pub points: i32,
    pub rejection_streak: i32,
    pub is_blocked: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    fn from_row(model: users::Model, profile: Option<profiles::Model>) -> Self {
        // Unknown profile rows grant the least privileged role.
        let role = profile
            .and_then(|p| Role::from_name(&p.name))
            .unwrap_or(Role::User);

        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            avatar_url: model.avatar_url,
            profile_id: model.profile_id,
            role,
            points: model.points,
            rejection_streak: model.rejection_streak,
            is_blocked: model.is_blocked,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    #[must_use]
    pub const fn reputation(&self) -> Reputation {
        Reputation {
            points: self.points,
            rejection_streak: self.rejection_streak,
            blocked: self.is_blocked,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub role: Role,
}

/// Column edits applied by [`UserRepository::update`]. `None` keeps a value.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: FieldChange<String>,
    pub avatar_url: FieldChange<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

impl Default for UserChanges {
    fn default() -> Self {
        Self {
            name: None,
            email: None,
            phone: FieldChange::Keep,
            avatar_url: FieldChange::Keep,
            role: None,
            password: None,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let row = users::Entity::find_by_id(id)
            .find_also_related(profiles::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(row.map(|(u, p)| User::from_row(u, p)))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .find_also_related(profiles::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(row.map(|(u, p)| User::from_row(u, p)))
    }

    /// Whether another account already uses `email`.
    pub async fn email_in_use(&self, email: &str, except_id: Option<i32>) -> Result<bool> {
        let mut query = users::Entity::find().filter(users::Column::Email.eq(email));
        if let Some(id) = except_id {
            query = query.filter(users::Column::Id.ne(id));
        }

        let count = query
            .count(&self.conn)
            .await
            .context("Failed to check email uniqueness")?;

        Ok(count > 0)
    }

    /// Verify credentials and return the matching user.
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let row = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .find_also_related(profiles::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some((user, profile)) = row else {
            return Ok(None);
        };

        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid.then(|| User::from_row(user, profile)))
    }

    pub async fn create(&self, new_user: NewUser, config: &SecurityConfig) -> Result<User> {
        let profile_id = self.profile_id(new_user.role).await?;
        let password_hash = hash_password_blocking(&new_user.password, config).await?;
        let now = chrono::Utc::now().to_rfc3339();

        let model = users::ActiveModel {
            name: Set(new_user.name),
            email: Set(new_user.email),
            phone: Set(new_user.phone),
            password_hash: Set(password_hash),
            profile_id: Set(profile_id),
            avatar_url: Set(Some(DEFAULT_AVATAR_URL.to_string())),
            points: Set(0),
            rejection_streak: Set(0),
            is_blocked: Set(false),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert user")?;

        self.get_by_id(model.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {} vanished after insert", model.id))
    }

    pub async fn update(
        &self,
        id: i32,
        changes: UserChanges,
        config: &SecurityConfig,
    ) -> Result<Option<User>> {
        let Some(user) = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?
        else {
            return Ok(None);
        };

        let new_hash = match changes.password {
            Some(password) => Some(hash_password_blocking(&password, config).await?),
            None => None,
        };
        let profile_id = match changes.role {
            Some(role) => Some(self.profile_id(role).await?),
            None => None,
        };

        let phone = changes.phone.apply(user.phone.clone());
        let avatar_url = changes.avatar_url.apply(user.avatar_url.clone());

        let mut active: users::ActiveModel = user.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(hash) = new_hash {
            active.password_hash = Set(hash);
        }
        if let Some(profile_id) = profile_id {
            active.profile_id = Set(profile_id);
        }
        active.phone = Set(phone);
        active.avatar_url = Set(avatar_url);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active
            .update(&self.conn)
            .await
            .context("Failed to update user")?;

        self.get_by_id(id).await
    }

    /// All users ordered by name, optionally filtered by a name/email substring.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<User>> {
        let mut query = users::Entity::find()
            .find_also_related(profiles::Entity)
            .order_by_asc(users::Column::Name);

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(users::Column::Name.contains(term))
                    .add(users::Column::Email.contains(term)),
            );
        }

        let rows = query.all(&self.conn).await.context("Failed to list users")?;

        Ok(rows
            .into_iter()
            .map(|(u, p)| User::from_row(u, p))
            .collect())
    }

    /// Non-blocked users with the highest point balance, ties broken by name.
    pub async fn ranking(&self, limit: u64) -> Result<Vec<User>> {
        let rows = users::Entity::find()
            .filter(users::Column::IsBlocked.eq(false))
            .find_also_related(profiles::Entity)
            .order_by_desc(users::Column::Points)
            .order_by_asc(users::Column::Name)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query ranking")?;

        Ok(rows
            .into_iter()
            .map(|(u, p)| User::from_row(u, p))
            .collect())
    }

    pub async fn count_occurrences(&self, user_id: i32) -> Result<u64> {
        occurrences::Entity::find()
            .filter(occurrences::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await
            .context("Failed to count user occurrences")
    }

    pub async fn has_role(&self, role: Role) -> Result<bool> {
        let profile_id = self.profile_id(role).await?;
        let count = users::Entity::find()
            .filter(users::Column::ProfileId.eq(profile_id))
            .count(&self.conn)
            .await
            .context("Failed to count users by profile")?;

        Ok(count > 0)
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }

    async fn profile_id(&self, role: Role) -> Result<i32> {
        let profile = profiles::Entity::find()
            .filter(profiles::Column::Name.eq(role.name()))
            .one(&self.conn)
            .await
            .context("Failed to query profile catalog")?
            .ok_or_else(|| anyhow::anyhow!("Profile '{role}' is missing from the catalog"))?;

        Ok(profile.id)
    }
}

/// Hash a password on the blocking pool.
pub async fn hash_password_blocking(password: &str, config: &SecurityConfig) -> Result<String> {
    let password = password.to_string();
    let config = config.clone();
    task::spawn_blocking(move || hash_password(&password, Some(&config)))
        .await
        .context("Password hashing task panicked")?
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses default (high memory) params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Generate a random token (64 character hex string)
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

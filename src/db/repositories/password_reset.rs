use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use super::user::{generate_token, hash_password_blocking};
use crate::config::SecurityConfig;
use crate::entities::{password_reset_tokens, users};

/// Outcome of redeeming a reset token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redemption {
    Redeemed { user_id: i32 },
    Invalid,
}

pub struct PasswordResetRepository {
    conn: DatabaseConnection,
}

impl PasswordResetRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Issues a fresh token for `user_id` and returns it.
    pub async fn issue(&self, user_id: i32, expires_at: DateTime<Utc>) -> Result<String> {
        let token = generate_token();

        password_reset_tokens::ActiveModel {
            user_id: Set(user_id),
            token: Set(token.clone()),
            expires_at: Set(expires_at.to_rfc3339()),
            used: Set(false),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to store password reset token")?;

        Ok(token)
    }

    /// Whether `token` exists, is unused and has not expired at `now`.
    pub async fn is_valid(&self, token: &str, now: DateTime<Utc>) -> Result<bool> {
        let row = password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::Token.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query password reset token")?;

        Ok(row.is_some_and(|r| usable(&r, now)))
    }

    /// Marks the token used and stores the new password hash atomically.
    pub async fn redeem(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
        config: &SecurityConfig,
    ) -> Result<Redemption> {
        let new_hash = hash_password_blocking(new_password, config).await?;

        let txn = self.conn.begin().await?;

        let Some(row) = password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::Token.eq(token))
            .one(&txn)
            .await
            .context("Failed to query password reset token")?
        else {
            return Ok(Redemption::Invalid);
        };

        if !usable(&row, now) {
            return Ok(Redemption::Invalid);
        }

        let user_id = row.user_id;
        let Some(user) = users::Entity::find_by_id(user_id).one(&txn).await? else {
            return Ok(Redemption::Invalid);
        };

        let mut active: password_reset_tokens::ActiveModel = row.into();
        active.used = Set(true);
        active.update(&txn).await?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.updated_at = Set(now.to_rfc3339());
        active.update(&txn).await?;

        txn.commit().await?;

        Ok(Redemption::Redeemed { user_id })
    }
}

fn usable(row: &password_reset_tokens::Model, now: DateTime<Utc>) -> bool {
    if row.used {
        return false;
    }

    DateTime::parse_from_rfc3339(&row.expires_at)
        .map(|expires_at| now < expires_at.with_timezone(&Utc))
        .unwrap_or(false)
}

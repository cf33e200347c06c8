use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};

use crate::entities::{agencies, occurrences};

pub use agencies::Model as Agency;

#[derive(Debug, Clone)]
pub struct AgencyInput {
    pub name: String,
    pub email: String,
    pub phone: String,
}

pub struct AgencyRepository {
    conn: DatabaseConnection,
}

impl AgencyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<Agency>> {
        agencies::Entity::find()
            .order_by_asc(agencies::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list agencies")
    }

    pub async fn get(&self, id: i32) -> Result<Option<Agency>> {
        agencies::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query agency")
    }

    pub async fn create(&self, input: AgencyInput) -> Result<Agency> {
        agencies::ActiveModel {
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert agency")
    }

    pub async fn update(&self, id: i32, input: AgencyInput) -> Result<Option<Agency>> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };

        let mut active: agencies::ActiveModel = existing.into();
        active.name = Set(input.name);
        active.email = Set(input.email);
        active.phone = Set(input.phone);
        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update agency")?;

        Ok(Some(updated))
    }

    /// Deletes the agency and unassigns it from every occurrence.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        occurrences::Entity::update_many()
            .col_expr(occurrences::Column::AgencyId, Expr::value(Option::<i32>::None))
            .filter(occurrences::Column::AgencyId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to clear agency assignments")?;

        let result = agencies::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .context("Failed to delete agency")?;

        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }
}

use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::domain::OccurrenceStatus;
use crate::entities::{occurrence_statuses, profiles};

/// Status catalog row resolved onto the closed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEntry {
    pub id: i32,
    pub status: OccurrenceStatus,
}

/// Read access to the seeded status and profile catalogs.
pub struct CatalogRepository {
    conn: DatabaseConnection,
}

impl CatalogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_statuses(&self) -> Result<Vec<StatusEntry>> {
        let rows = occurrence_statuses::Entity::find()
            .order_by_asc(occurrence_statuses::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list occurrence statuses")?;

        Ok(rows.into_iter().filter_map(to_entry).collect())
    }

    /// Returns `None` for unknown ids and for rows whose name is not a known status.
    pub async fn get_status(&self, id: i32) -> Result<Option<StatusEntry>> {
        let row = occurrence_statuses::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query occurrence status")?;

        Ok(row.and_then(to_entry))
    }

    pub async fn find_status(&self, status: OccurrenceStatus) -> Result<Option<StatusEntry>> {
        let row = occurrence_statuses::Entity::find()
            .filter(occurrence_statuses::Column::Name.eq(status.name()))
            .one(&self.conn)
            .await
            .context("Failed to query occurrence status by name")?;

        Ok(row.and_then(to_entry))
    }

    pub async fn list_profiles(&self) -> Result<Vec<profiles::Model>> {
        profiles::Entity::find()
            .order_by_asc(profiles::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list profiles")
    }

    pub async fn get_profile(&self, id: i32) -> Result<Option<profiles::Model>> {
        profiles::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query profile")
    }
}

fn to_entry(row: occurrence_statuses::Model) -> Option<StatusEntry> {
    match OccurrenceStatus::from_name(&row.name) {
        Some(status) => Some(StatusEntry { id: row.id, status }),
        None => {
            tracing::warn!(id = row.id, name = %row.name, "Ignoring unknown status catalog row");
            None
        }
    }
}

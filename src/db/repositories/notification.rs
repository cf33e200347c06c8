use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::notifications;

pub use notifications::Model as Notification;

pub struct NotificationRepository {
    conn: DatabaseConnection,
}

impl NotificationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn record(
        &self,
        occurrence_id: i32,
        message: &str,
        recipient_email: &str,
    ) -> Result<Notification> {
        notifications::ActiveModel {
            message: Set(message.to_string()),
            sent_at: Set(chrono::Utc::now().to_rfc3339()),
            recipient_email: Set(Some(recipient_email.to_string())),
            occurrence_id: Set(occurrence_id),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to record notification")
    }

    /// Oldest first.
    pub async fn list_for_occurrence(&self, occurrence_id: i32) -> Result<Vec<Notification>> {
        notifications::Entity::find()
            .filter(notifications::Column::OccurrenceId.eq(occurrence_id))
            .order_by_asc(notifications::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list notifications")
    }
}

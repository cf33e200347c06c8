use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::domain::{PointType, TransitionPlan};
use crate::entities::{
    agencies, coordinates, images, notifications, occurrence_statuses, occurrences, users,
};

/// Occurrence joined with the names and child rows the API exposes.
#[derive(Debug, Clone)]
pub struct Occurrence {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub address: String,
    pub registered_on: NaiveDate,
    pub finalized_on: Option<NaiveDate>,
    pub status_id: i32,
    pub status_name: String,
    pub user_id: i32,
    pub reporter_name: String,
    pub agency_id: Option<i32>,
    pub agency_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_urls: Vec<String>,
    pub point_type: Option<String>,
    pub rejection_justification: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOccurrence {
    pub title: String,
    pub description: String,
    pub address: String,
    pub registered_on: NaiveDate,
    pub status_id: i32,
    pub user_id: i32,
    pub coordinates: Option<(f64, f64)>,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OccurrenceFilter {
    pub status_ids: Option<Vec<i32>>,
    pub user_id: Option<i32>,
    pub with_coordinates: bool,
}

/// Status change applied together with the reporter's new reputation.
#[derive(Debug, Clone)]
pub struct AppliedTransition {
    pub status_id: i32,
    pub plan: TransitionPlan,
}

#[derive(Debug, Clone, Default)]
pub struct OccurrenceUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    /// Always written; `None` unassigns.
    pub agency_id: Option<i32>,
    pub transition: Option<AppliedTransition>,
}

pub struct OccurrenceRepository {
    conn: DatabaseConnection,
}

impl OccurrenceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts the occurrence with its coordinate and image rows atomically.
    pub async fn create(&self, input: NewOccurrence) -> Result<i32> {
        let txn = self.conn.begin().await?;

        let coordinate_id = match input.coordinates {
            Some((latitude, longitude)) => {
                let coordinate = coordinates::ActiveModel {
                    latitude: Set(latitude),
                    longitude: Set(longitude),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .context("Failed to insert coordinates")?;
                Some(coordinate.id)
            }
            None => None,
        };

        let occurrence = occurrences::ActiveModel {
            title: Set(input.title),
            description: Set(input.description),
            address: Set(input.address),
            registered_on: Set(input.registered_on),
            finalized_on: Set(None),
            status_id: Set(input.status_id),
            user_id: Set(input.user_id),
            agency_id: Set(None),
            coordinate_id: Set(coordinate_id),
            point_type: Set(None),
            rejection_justification: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert occurrence")?;

        if !input.image_urls.is_empty() {
            let rows = input.image_urls.into_iter().map(|url| images::ActiveModel {
                url: Set(url),
                occurrence_id: Set(occurrence.id),
                ..Default::default()
            });
            images::Entity::insert_many(rows)
                .exec(&txn)
                .await
                .context("Failed to insert occurrence images")?;
        }

        txn.commit().await?;

        Ok(occurrence.id)
    }

    /// Raw row, used by the transition handler.
    pub async fn get_row(&self, id: i32) -> Result<Option<occurrences::Model>> {
        occurrences::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query occurrence")
    }

    pub async fn get(&self, id: i32) -> Result<Option<Occurrence>> {
        let Some(row) = self.get_row(id).await? else {
            return Ok(None);
        };

        Ok(self.hydrate(vec![row]).await?.pop())
    }

    /// Newest first.
    pub async fn list(&self, filter: OccurrenceFilter) -> Result<Vec<Occurrence>> {
        let mut query = occurrences::Entity::find()
            .order_by_desc(occurrences::Column::RegisteredOn)
            .order_by_desc(occurrences::Column::Id);

        if let Some(status_ids) = filter.status_ids {
            query = query.filter(occurrences::Column::StatusId.is_in(status_ids));
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(occurrences::Column::UserId.eq(user_id));
        }
        if filter.with_coordinates {
            query = query.filter(occurrences::Column::CoordinateId.is_not_null());
        }

        let rows = query
            .all(&self.conn)
            .await
            .context("Failed to list occurrences")?;

        self.hydrate(rows).await
    }

    /// Writes field edits, the agency assignment and, when present, the status
    /// transition and reporter reputation in one transaction.
    pub async fn apply_update(&self, id: i32, update: OccurrenceUpdate) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let Some(current) = occurrences::Entity::find_by_id(id)
            .one(&txn)
            .await
            .context("Failed to load occurrence for update")?
        else {
            return Ok(false);
        };

        let reporter_id = current.user_id;
        let finalized_on = current.finalized_on;
        let justification = current.rejection_justification.clone();
        let point_type = current.point_type.clone();

        let mut active: occurrences::ActiveModel = current.into();
        if let Some(title) = update.title {
            active.title = Set(title);
        }
        if let Some(description) = update.description {
            active.description = Set(description);
        }
        if let Some(address) = update.address {
            active.address = Set(address);
        }
        active.agency_id = Set(update.agency_id);

        let reputation = update.transition.map(|AppliedTransition { status_id, plan }| {
            active.status_id = Set(status_id);
            active.finalized_on = Set(plan.finalized_on.apply(finalized_on));
            active.rejection_justification = Set(plan.rejection_justification.apply(justification));
            let stored_type = point_type.and_then(|t| PointType::parse(&t));
            active.point_type =
                Set(plan.point_type.apply(stored_type).map(|t| t.as_str().to_string()));
            plan.reputation
        });

        active
            .update(&txn)
            .await
            .context("Failed to update occurrence")?;

        if let Some(reputation) = reputation {
            let reporter = users::Entity::find_by_id(reporter_id)
                .one(&txn)
                .await
                .context("Failed to load reporter for reputation update")?
                .ok_or_else(|| anyhow::anyhow!("Reporter {reporter_id} not found"))?;

            let mut active: users::ActiveModel = reporter.into();
            active.points = Set(reputation.points);
            active.rejection_streak = Set(reputation.rejection_streak);
            active.is_blocked = Set(reputation.blocked);
            active.updated_at = Set(chrono::Utc::now().to_rfc3339());
            active
                .update(&txn)
                .await
                .context("Failed to update reporter reputation")?;
        }

        txn.commit().await?;

        Ok(true)
    }

    /// Deletes the occurrence with its images, notification history and
    /// coordinates. Returns the removed image URLs, or `None` if it did not exist.
    pub async fn delete(&self, id: i32) -> Result<Option<Vec<String>>> {
        let txn = self.conn.begin().await?;

        let Some(occurrence) = occurrences::Entity::find_by_id(id)
            .one(&txn)
            .await
            .context("Failed to load occurrence for deletion")?
        else {
            return Ok(None);
        };

        let image_urls: Vec<String> = images::Entity::find()
            .filter(images::Column::OccurrenceId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|image| image.url)
            .collect();

        images::Entity::delete_many()
            .filter(images::Column::OccurrenceId.eq(id))
            .exec(&txn)
            .await?;

        notifications::Entity::delete_many()
            .filter(notifications::Column::OccurrenceId.eq(id))
            .exec(&txn)
            .await?;

        occurrences::Entity::delete_by_id(id).exec(&txn).await?;

        if let Some(coordinate_id) = occurrence.coordinate_id {
            coordinates::Entity::delete_by_id(coordinate_id)
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        Ok(Some(image_urls))
    }

    async fn hydrate(&self, rows: Vec<occurrences::Model>) -> Result<Vec<Occurrence>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let occurrence_ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let user_ids: Vec<i32> = rows.iter().map(|r| r.user_id).collect();
        let agency_ids: Vec<i32> = rows.iter().filter_map(|r| r.agency_id).collect();
        let coordinate_ids: Vec<i32> = rows.iter().filter_map(|r| r.coordinate_id).collect();

        let statuses: HashMap<i32, String> = occurrence_statuses::Entity::find()
            .all(&self.conn)
            .await
            .context("Failed to load status catalog")?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        let reporters: HashMap<i32, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.conn)
            .await
            .context("Failed to load reporters")?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        let agency_names: HashMap<i32, String> = if agency_ids.is_empty() {
            HashMap::new()
        } else {
            agencies::Entity::find()
                .filter(agencies::Column::Id.is_in(agency_ids))
                .all(&self.conn)
                .await
                .context("Failed to load agencies")?
                .into_iter()
                .map(|a| (a.id, a.name))
                .collect()
        };

        let points: HashMap<i32, (f64, f64)> = if coordinate_ids.is_empty() {
            HashMap::new()
        } else {
            coordinates::Entity::find()
                .filter(coordinates::Column::Id.is_in(coordinate_ids))
                .all(&self.conn)
                .await
                .context("Failed to load coordinates")?
                .into_iter()
                .map(|c| (c.id, (c.latitude, c.longitude)))
                .collect()
        };

        let mut image_urls: HashMap<i32, Vec<String>> = HashMap::new();
        for image in images::Entity::find()
            .filter(images::Column::OccurrenceId.is_in(occurrence_ids))
            .order_by_asc(images::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to load occurrence images")?
        {
            image_urls
                .entry(image.occurrence_id)
                .or_default()
                .push(image.url);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let coordinate = row.coordinate_id.and_then(|id| points.get(&id).copied());
                Occurrence {
                    id: row.id,
                    title: row.title,
                    description: row.description,
                    address: row.address,
                    registered_on: row.registered_on,
                    finalized_on: row.finalized_on,
                    status_id: row.status_id,
                    status_name: statuses.get(&row.status_id).cloned().unwrap_or_default(),
                    user_id: row.user_id,
                    reporter_name: reporters.get(&row.user_id).cloned().unwrap_or_default(),
                    agency_id: row.agency_id,
                    agency_name: row.agency_id.and_then(|id| agency_names.get(&id).cloned()),
                    latitude: coordinate.map(|c| c.0),
                    longitude: coordinate.map(|c| c.1),
                    image_urls: image_urls.remove(&row.id).unwrap_or_default(),
                    point_type: row.point_type,
                    rejection_justification: row.rejection_justification,
                }
            })
            .collect())
    }
}

//! `SeaORM` implementation of the `OccurrenceService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{
    AppliedTransition, NewOccurrence, Notification, Occurrence, OccurrenceFilter,
    OccurrenceUpdate, Store, User,
};
use crate::domain::{OccurrenceStatus, RejectionNotice, plan_transition};
use crate::services::mailer::{Mailer, templates};
use crate::services::occurrence_service::{
    CreateOccurrence, OccurrenceError, OccurrenceService, UpdateOccurrence,
};
use crate::services::storage::ImageStorage;

pub struct SeaOrmOccurrenceService {
    store: Store,
    config: Arc<RwLock<Config>>,
    storage: Arc<ImageStorage>,
    mailer: Arc<dyn Mailer>,
}

impl SeaOrmOccurrenceService {
    #[must_use]
    pub fn new(
        store: Store,
        config: Arc<RwLock<Config>>,
        storage: Arc<ImageStorage>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            store,
            config,
            storage,
            mailer,
        }
    }

    async fn reload(&self, id: i32) -> Result<Occurrence, OccurrenceError> {
        self.store
            .get_occurrence(id)
            .await?
            .ok_or(OccurrenceError::NotFound(id))
    }

    /// Sends the rejection email and records it in the history once accepted.
    /// Never fails: the transition is already committed.
    async fn notify_rejection(
        &self,
        occurrence: &Occurrence,
        reporter: &User,
        notice: &RejectionNotice,
    ) {
        let mail = templates::occurrence_rejected(
            &reporter.name,
            &occurrence.title,
            &notice.justification,
            notice.account_blocked,
        );

        if let Err(e) = self.mailer.send(&reporter.email, &mail).await {
            warn!(
                occurrence_id = occurrence.id,
                user_id = reporter.id,
                error = %e,
                "Failed to send rejection email"
            );
            metrics::counter!("notification_failures_total", "kind" => "rejection").increment(1);
            return;
        }

        if let Err(e) = self
            .store
            .record_notification(occurrence.id, &mail.body, &reporter.email)
            .await
        {
            warn!(
                occurrence_id = occurrence.id,
                error = %e,
                "Rejection email sent but history entry could not be stored"
            );
        }
    }
}

fn required(field: &str, value: &str) -> Result<String, OccurrenceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(OccurrenceError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn optional_edit(field: &str, value: Option<String>) -> Result<Option<String>, OccurrenceError> {
    value.map(|v| required(field, &v)).transpose()
}

fn parse_coordinate(
    field: &str,
    value: Option<&str>,
    range: std::ops::RangeInclusive<f64>,
) -> Result<Option<f64>, OccurrenceError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let parsed: f64 = raw
        .parse()
        .map_err(|_| OccurrenceError::Validation(format!("{field} must be a number")))?;

    if !parsed.is_finite() || !range.contains(&parsed) {
        return Err(OccurrenceError::Validation(format!(
            "{field} must be between {} and {}",
            range.start(),
            range.end()
        )));
    }

    Ok(Some(parsed))
}

/// Validates the coordinate pair. Both or neither must be present.
fn parse_coordinates(
    latitude: Option<&str>,
    longitude: Option<&str>,
    required: bool,
) -> Result<Option<(f64, f64)>, OccurrenceError> {
    let latitude = parse_coordinate("Latitude", latitude, -90.0..=90.0)?;
    let longitude = parse_coordinate("Longitude", longitude, -180.0..=180.0)?;

    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Ok(Some((lat, lon))),
        (None, None) if !required => Ok(None),
        _ => Err(OccurrenceError::Validation(
            "Latitude and longitude are required".to_string(),
        )),
    }
}

#[async_trait]
impl OccurrenceService for SeaOrmOccurrenceService {
    async fn create(
        &self,
        reporter_id: i32,
        input: CreateOccurrence,
    ) -> Result<Occurrence, OccurrenceError> {
        let (initial_status, require_coordinates) = {
            let config = self.config.read().await;
            (
                config.occurrences.initial_status.clone(),
                config.occurrences.require_coordinates,
            )
        };

        let title = required("Title", &input.title)?;
        let address = required("Address", &input.address)?;
        let description = required("Description", &input.description)?;
        let coordinates = parse_coordinates(
            input.latitude.as_deref(),
            input.longitude.as_deref(),
            require_coordinates,
        )?;

        let status = OccurrenceStatus::from_name(&initial_status)
            .ok_or_else(|| OccurrenceError::StatusNotFound(initial_status.clone()))?;
        let status = self
            .store
            .find_status(status)
            .await?
            .ok_or(OccurrenceError::StatusNotFound(initial_status))?;

        let mut image_urls = Vec::with_capacity(input.images.len());
        for upload in &input.images {
            match self.storage.save(upload).await {
                Ok(url) => image_urls.push(url),
                Err(e) => {
                    self.storage.remove_all(&image_urls).await;
                    return Err(e.into());
                }
            }
        }

        let created = self
            .store
            .create_occurrence(NewOccurrence {
                title,
                description,
                address,
                registered_on: chrono::Local::now().date_naive(),
                status_id: status.id,
                user_id: reporter_id,
                coordinates,
                image_urls: image_urls.clone(),
            })
            .await;

        let id = match created {
            Ok(id) => id,
            Err(e) => {
                self.storage.remove_all(&image_urls).await;
                return Err(e.into());
            }
        };

        info!(
            occurrence_id = id,
            user_id = reporter_id,
            images = image_urls.len(),
            status = %status.status,
            "Occurrence registered"
        );
        metrics::counter!("occurrences_created_total").increment(1);

        self.reload(id).await
    }

    async fn get(&self, id: i32) -> Result<Occurrence, OccurrenceError> {
        self.reload(id).await
    }

    async fn list(&self, status_id: Option<i32>) -> Result<Vec<Occurrence>, OccurrenceError> {
        Ok(self
            .store
            .list_occurrences(OccurrenceFilter {
                status_ids: status_id.map(|id| vec![id]),
                ..OccurrenceFilter::default()
            })
            .await?)
    }

    async fn list_active(&self) -> Result<Vec<Occurrence>, OccurrenceError> {
        let status_ids: Vec<i32> = self
            .store
            .list_statuses()
            .await?
            .into_iter()
            .filter(|entry| entry.status.is_active())
            .map(|entry| entry.id)
            .collect();

        Ok(self
            .store
            .list_occurrences(OccurrenceFilter {
                status_ids: Some(status_ids),
                with_coordinates: true,
                ..OccurrenceFilter::default()
            })
            .await?)
    }

    async fn list_for_reporter(&self, user_id: i32) -> Result<Vec<Occurrence>, OccurrenceError> {
        Ok(self
            .store
            .list_occurrences(OccurrenceFilter {
                user_id: Some(user_id),
                ..OccurrenceFilter::default()
            })
            .await?)
    }

    async fn update(
        &self,
        id: i32,
        input: UpdateOccurrence,
    ) -> Result<Occurrence, OccurrenceError> {
        let row = self
            .store
            .get_occurrence_row(id)
            .await?
            .ok_or(OccurrenceError::NotFound(id))?;

        let target = self
            .store
            .get_status(input.status_id)
            .await?
            .ok_or_else(|| OccurrenceError::StatusNotFound(input.status_id.to_string()))?;

        let current = self.store.get_status(row.status_id).await?.ok_or_else(|| {
            OccurrenceError::Internal(format!(
                "Occurrence {id} references unknown status {}",
                row.status_id
            ))
        })?;

        if let Some(agency_id) = input.agency_id
            && self.store.get_agency(agency_id).await?.is_none()
        {
            return Err(OccurrenceError::AgencyNotFound(agency_id));
        }

        let title = optional_edit("Title", input.title)?;
        let description = optional_edit("Description", input.description)?;
        let address = optional_edit("Address", input.address)?;

        let reporter = self.store.get_user(row.user_id).await?.ok_or_else(|| {
            OccurrenceError::Internal(format!(
                "Reporter {} of occurrence {id} not found",
                row.user_id
            ))
        })?;

        let plan = plan_transition(
            current.status,
            target.status,
            input.rejection_justification.as_deref(),
            reporter.reputation(),
            chrono::Local::now().date_naive(),
        )?;

        let notice = plan.as_ref().and_then(|p| p.notice.clone());
        let reputation = plan.as_ref().map(|p| p.reputation);

        let updated = self
            .store
            .update_occurrence(
                id,
                OccurrenceUpdate {
                    title,
                    description,
                    address,
                    agency_id: input.agency_id,
                    transition: plan.map(|plan| AppliedTransition {
                        status_id: target.id,
                        plan,
                    }),
                },
            )
            .await?;

        if !updated {
            return Err(OccurrenceError::NotFound(id));
        }

        if let Some(reputation) = reputation {
            info!(
                occurrence_id = id,
                user_id = reporter.id,
                from = %current.status,
                to = %target.status,
                points = reputation.points,
                rejection_streak = reputation.rejection_streak,
                blocked = reputation.blocked,
                "Occurrence status changed"
            );
            metrics::counter!(
                "occurrence_transitions_total",
                "from" => current.status.name(),
                "to" => target.status.name()
            )
            .increment(1);

            if reputation.blocked && !reporter.is_blocked {
                warn!(user_id = reporter.id, "Account blocked after repeated rejections");
            } else if !reputation.blocked && reporter.is_blocked {
                info!(user_id = reporter.id, "Account unblocked");
            }
        }

        let occurrence = self.reload(id).await?;

        if let Some(notice) = notice {
            self.notify_rejection(&occurrence, &reporter, &notice).await;
        }

        Ok(occurrence)
    }

    async fn delete(&self, id: i32) -> Result<(), OccurrenceError> {
        let image_urls = self
            .store
            .delete_occurrence(id)
            .await?
            .ok_or(OccurrenceError::NotFound(id))?;

        self.storage.remove_all(&image_urls).await;

        info!(occurrence_id = id, images = image_urls.len(), "Occurrence deleted");
        Ok(())
    }

    async fn notifications(&self, id: i32) -> Result<Vec<Notification>, OccurrenceError> {
        if self.store.get_occurrence_row(id).await?.is_none() {
            return Err(OccurrenceError::NotFound(id));
        }

        Ok(self.store.list_notifications(id).await?)
    }
}

use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::domain::{OccurrenceStatus, Role};

pub mod migrator;
pub mod repositories;

pub use repositories::agency::{Agency, AgencyInput};
pub use repositories::catalog::StatusEntry;
pub use repositories::notification::Notification;
pub use repositories::occurrence::{
    AppliedTransition, NewOccurrence, Occurrence, OccurrenceFilter, OccurrenceUpdate,
};
pub use repositories::password_reset::Redemption;
pub use repositories::user::{NewUser, User, UserChanges};

pub use crate::entities::occurrences::Model as OccurrenceRow;
pub use crate::entities::profiles::Model as Profile;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn occurrence_repo(&self) -> repositories::occurrence::OccurrenceRepository {
        repositories::occurrence::OccurrenceRepository::new(self.conn.clone())
    }

    fn catalog_repo(&self) -> repositories::catalog::CatalogRepository {
        repositories::catalog::CatalogRepository::new(self.conn.clone())
    }

    fn agency_repo(&self) -> repositories::agency::AgencyRepository {
        repositories::agency::AgencyRepository::new(self.conn.clone())
    }

    fn notification_repo(&self) -> repositories::notification::NotificationRepository {
        repositories::notification::NotificationRepository::new(self.conn.clone())
    }

    fn password_reset_repo(&self) -> repositories::password_reset::PasswordResetRepository {
        repositories::password_reset::PasswordResetRepository::new(self.conn.clone())
    }

    // Users

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn email_in_use(&self, email: &str, except_id: Option<i32>) -> Result<bool> {
        self.user_repo().email_in_use(email, except_id).await
    }

    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_credentials(email, password).await
    }

    pub async fn create_user(&self, user: NewUser, config: &SecurityConfig) -> Result<User> {
        self.user_repo().create(user, config).await
    }

    pub async fn update_user(
        &self,
        id: i32,
        changes: UserChanges,
        config: &SecurityConfig,
    ) -> Result<Option<User>> {
        self.user_repo().update(id, changes, config).await
    }

    pub async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>> {
        self.user_repo().list(search).await
    }

    pub async fn ranking(&self, limit: u64) -> Result<Vec<User>> {
        self.user_repo().ranking(limit).await
    }

    pub async fn count_user_occurrences(&self, user_id: i32) -> Result<u64> {
        self.user_repo().count_occurrences(user_id).await
    }

    pub async fn has_user_with_role(&self, role: Role) -> Result<bool> {
        self.user_repo().has_role(role).await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    // Occurrences

    pub async fn create_occurrence(&self, occurrence: NewOccurrence) -> Result<i32> {
        self.occurrence_repo().create(occurrence).await
    }

    pub async fn get_occurrence_row(&self, id: i32) -> Result<Option<OccurrenceRow>> {
        self.occurrence_repo().get_row(id).await
    }

    pub async fn get_occurrence(&self, id: i32) -> Result<Option<Occurrence>> {
        self.occurrence_repo().get(id).await
    }

    pub async fn list_occurrences(&self, filter: OccurrenceFilter) -> Result<Vec<Occurrence>> {
        self.occurrence_repo().list(filter).await
    }

    pub async fn update_occurrence(&self, id: i32, update: OccurrenceUpdate) -> Result<bool> {
        self.occurrence_repo().apply_update(id, update).await
    }

    pub async fn delete_occurrence(&self, id: i32) -> Result<Option<Vec<String>>> {
        self.occurrence_repo().delete(id).await
    }

    // Catalogs

    pub async fn list_statuses(&self) -> Result<Vec<StatusEntry>> {
        self.catalog_repo().list_statuses().await
    }

    pub async fn get_status(&self, id: i32) -> Result<Option<StatusEntry>> {
        self.catalog_repo().get_status(id).await
    }

    pub async fn find_status(&self, status: OccurrenceStatus) -> Result<Option<StatusEntry>> {
        self.catalog_repo().find_status(status).await
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.catalog_repo().list_profiles().await
    }

    pub async fn get_profile(&self, id: i32) -> Result<Option<Profile>> {
        self.catalog_repo().get_profile(id).await
    }

    // Agencies

    pub async fn list_agencies(&self) -> Result<Vec<Agency>> {
        self.agency_repo().list().await
    }

    pub async fn get_agency(&self, id: i32) -> Result<Option<Agency>> {
        self.agency_repo().get(id).await
    }

    pub async fn create_agency(&self, input: AgencyInput) -> Result<Agency> {
        self.agency_repo().create(input).await
    }

    pub async fn update_agency(&self, id: i32, input: AgencyInput) -> Result<Option<Agency>> {
        self.agency_repo().update(id, input).await
    }

    pub async fn delete_agency(&self, id: i32) -> Result<bool> {
        self.agency_repo().delete(id).await
    }

    // Notifications

    pub async fn record_notification(
        &self,
        occurrence_id: i32,
        message: &str,
        recipient_email: &str,
    ) -> Result<Notification> {
        self.notification_repo()
            .record(occurrence_id, message, recipient_email)
            .await
    }

    pub async fn list_notifications(&self, occurrence_id: i32) -> Result<Vec<Notification>> {
        self.notification_repo()
            .list_for_occurrence(occurrence_id)
            .await
    }

    // Password reset

    pub async fn issue_reset_token(&self, user_id: i32, expires_at: DateTime<Utc>) -> Result<String> {
        self.password_reset_repo().issue(user_id, expires_at).await
    }

    pub async fn is_reset_token_valid(&self, token: &str, now: DateTime<Utc>) -> Result<bool> {
        self.password_reset_repo().is_valid(token, now).await
    }

    pub async fn redeem_reset_token(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
        config: &SecurityConfig,
    ) -> Result<Redemption> {
        self.password_reset_repo()
            .redeem(token, new_password, now, config)
            .await
    }
}

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, ImageStorage, Mailer, OccurrenceService, SeaOrmAuthService,
    SeaOrmOccurrenceService, SeaOrmUserService, UserService, build_mailer,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub mailer: Arc<dyn Mailer>,

    pub storage: Arc<ImageStorage>,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,

    pub occurrence_service: Arc<dyn OccurrenceService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let mailer = build_mailer(&config.mail)?;
        Self::with_mailer(config, mailer).await
    }

    /// Builds the state around an explicit mail transport.
    pub async fn with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let storage = Arc::new(ImageStorage::new(&config.uploads));
        let bootstrap = config.bootstrap.clone();
        let config_arc = Arc::new(RwLock::new(config));

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config_arc.clone(),
            mailer.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        let user_service = Arc::new(SeaOrmUserService::new(store.clone(), config_arc.clone()))
            as Arc<dyn UserService + Send + Sync + 'static>;

        let occurrence_service = Arc::new(SeaOrmOccurrenceService::new(
            store.clone(),
            config_arc.clone(),
            storage.clone(),
            mailer.clone(),
        )) as Arc<dyn OccurrenceService + Send + Sync + 'static>;

        auth_service
            .ensure_default_admin(&bootstrap)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to ensure default administrator: {e}"))?;

        Ok(Self {
            config: config_arc,
            store,
            mailer,
            storage,
            auth_service,
            user_service,
            occurrence_service,
        })
    }
}

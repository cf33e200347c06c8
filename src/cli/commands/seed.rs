//! Seed command handler

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, LogMailer, SeaOrmAuthService};

pub async fn cmd_seed(config: &Config) -> anyhow::Result<()> {
    // Reference catalogs are part of the migration set.
    let store = Store::new(&config.general.database_path).await?;

    let statuses = store.list_statuses().await?;
    let profiles = store.list_profiles().await?;
    println!(
        "Reference data ready: {} statuses, {} profiles",
        statuses.len(),
        profiles.len()
    );

    let auth = SeaOrmAuthService::new(
        store,
        Arc::new(RwLock::new(config.clone())),
        Arc::new(LogMailer),
    );

    match auth
        .ensure_default_admin(&config.bootstrap)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create administrator: {e}"))?
    {
        Some(admin) => println!("Created administrator {} <{}>", admin.name, admin.email),
        None => println!("An administrator already exists, nothing to do"),
    }

    Ok(())
}

//! Create-admin command handler

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, LogMailer, SeaOrmAuthService};

pub async fn cmd_create_admin(
    config: &Config,
    name: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let auth = SeaOrmAuthService::new(
        store,
        Arc::new(RwLock::new(config.clone())),
        Arc::new(LogMailer),
    );

    let admin = auth
        .create_admin(name, email, password)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create administrator: {e}"))?;

    println!("✓ Administrator created");
    println!("  ID: {} | Name: {} | Email: {}", admin.id, admin.name, admin.email);

    Ok(())
}

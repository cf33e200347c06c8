use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::OccurrenceStatus;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "SVCA_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub mail: MailConfig,

    pub uploads: UploadConfig,

    pub occurrences: OccurrenceConfig,

    pub ranking: RankingConfig,

    pub bootstrap: BootstrapConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:instance/svca.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub host: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    pub session_inactivity_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            secure_cookies: true,
            session_inactivity_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,

    pub password_min_length: usize,

    /// Lifetime of a password reset link.
    pub reset_token_ttl_minutes: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            password_min_length: 6,
            reset_token_ttl_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// When disabled, messages are logged instead of sent.
    pub enabled: bool,

    pub smtp_host: String,

    pub smtp_port: u16,

    pub starttls: bool,

    pub username: Option<String>,

    pub password: Option<String>,

    pub from_address: String,

    /// Frontend page that receives the reset token as its last path segment.
    pub reset_base_url: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            starttls: true,
            username: None,
            password: None,
            from_address: "SVCA <noreply@svca.local>".to_string(),
            reset_base_url: "http://localhost:5173/reset-password".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory where uploaded images are written.
    pub path: String,

    /// URL prefix the directory is served under.
    pub public_prefix: String,

    pub max_file_size_mb: usize,

    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: "uploads".to_string(),
            public_prefix: "/uploads".to_string(),
            max_file_size_mb: 10,
            allowed_extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "gif".to_string(),
                "webp".to_string(),
            ],
        }
    }
}

impl UploadConfig {
    #[must_use]
    pub const fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OccurrenceConfig {
    /// Status name new occurrences start in.
    pub initial_status: String,

    /// Whether latitude/longitude are mandatory on creation.
    pub require_coordinates: bool,
}

impl Default for OccurrenceConfig {
    fn default() -> Self {
        Self {
            initial_status: OccurrenceStatus::Registered.name().to_string(),
            require_coordinates: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub size: u64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { size: 10 }
    }
}

/// Administrator account created when the database has none.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub admin_name: String,

    pub admin_email: String,

    pub admin_password: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_name: "Administrador".to_string(),
            admin_email: "admin@example.com".to_string(),
            admin_password: "change-me-now".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            mail: MailConfig::default(),
            uploads: UploadConfig::default(),
            occurrences: OccurrenceConfig::default(),
            ranking: RankingConfig::default(),
            bootstrap: BootstrapConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(explicit);
            info!("Loading config from {}: {}", CONFIG_PATH_ENV, path.display());
            return Self::load_from_path(&path);
        }

        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("svca").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".svca").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if OccurrenceStatus::from_name(&self.occurrences.initial_status).is_none() {
            anyhow::bail!(
                "Unknown initial occurrence status '{}'",
                self.occurrences.initial_status
            );
        }

        if self.mail.enabled && self.mail.smtp_host.trim().is_empty() {
            anyhow::bail!("SMTP host cannot be empty when mail is enabled");
        }

        if self.security.password_min_length == 0 {
            anyhow::bail!("Password minimum length must be > 0");
        }

        if self.security.reset_token_ttl_minutes <= 0 {
            anyhow::bail!("Reset token lifetime must be > 0 minutes");
        }

        if self.uploads.max_file_size_mb == 0 {
            anyhow::bail!("Upload size limit must be > 0");
        }

        if self.bootstrap.admin_password.len() < self.security.password_min_length {
            anyhow::bail!("Bootstrap administrator password is shorter than the password policy");
        }

        Ok(())
    }
}

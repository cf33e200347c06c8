use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::UploadConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File type '{0}' is not allowed")]
    DisallowedExtension(String),

    #[error("File exceeds the {0} MB upload limit")]
    TooLarge(usize),

    #[error("Empty file")]
    Empty,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

/// Writes uploaded images to the upload directory and maps them to public URLs.
pub struct ImageStorage {
    root: PathBuf,
    public_prefix: String,
    allowed_extensions: Vec<String>,
    max_file_size_mb: usize,
}

impl ImageStorage {
    #[must_use]
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: PathBuf::from(&config.path),
            public_prefix: config.public_prefix.trim_end_matches('/').to_string(),
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
            max_file_size_mb: config.max_file_size_mb,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores the file under a random name and returns its public URL.
    pub async fn save(&self, upload: &ImageUpload) -> Result<String, StorageError> {
        if upload.bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        if upload.bytes.len() > self.max_file_size_mb * 1024 * 1024 {
            return Err(StorageError::TooLarge(self.max_file_size_mb));
        }

        let extension = upload
            .filename
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let is_image = mime_guess::from_ext(&extension)
            .first()
            .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE);

        if !is_image || !self.allowed_extensions.contains(&extension) {
            return Err(StorageError::DisallowedExtension(extension));
        }

        if !self.root.exists() {
            fs::create_dir_all(&self.root).await?;
        }

        let filename = format!("{}.{}", Uuid::new_v4().simple(), extension);
        let file_path = self.root.join(&filename);

        fs::write(&file_path, &upload.bytes).await?;

        info!(path = %file_path.display(), size = upload.bytes.len(), "Stored uploaded image");

        Ok(format!("{}/{}", self.public_prefix, filename))
    }

    /// Removes the files behind the given public URLs. Failures are logged.
    pub async fn remove_all(&self, urls: &[String]) {
        for url in urls {
            let Some(path) = self.path_for(url) else {
                warn!(url = %url, "Image URL is outside the upload directory, skipping removal");
                continue;
            };

            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove image file");
            }
        }
    }

    fn path_for(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(&self.public_prefix)?.strip_prefix('/')?;
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return None;
        }
        Some(self.root.join(name))
    }
}

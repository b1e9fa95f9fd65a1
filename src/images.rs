//! Image storage behind campground listings.
//!
//! Uploading returns the public URL and the storage identifier (`filename`)
//! recorded on the campground; deleting takes that identifier back.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Folder every upload lands in, inside the storage root
pub const UPLOAD_FOLDER: &str = "YelpCamp";

/// Extensions accepted for uploads
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// A stored image as referenced by a campground
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    pub url: String,
    pub filename: String,
}

/// A file received from a form, not yet stored
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub original_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ImageUpload {
    /// Lowercased extension of the submitted file name
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    pub fn has_allowed_extension(&self) -> bool {
        self.extension()
            .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
    }
}

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("unsupported image type '{0}'")]
    UnsupportedType(String),

    #[error("invalid image identifier '{0}'")]
    InvalidFilename(String),

    #[error("image storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ImageStore: Send + Sync + 'static {
    async fn upload(&self, upload: ImageUpload) -> Result<StoredImage, ImageStoreError>;

    /// Remove an image. Removing an image that is already gone succeeds.
    async fn delete(&self, filename: &str) -> Result<(), ImageStoreError>;
}

fn new_filename(upload: &ImageUpload) -> Result<String, ImageStoreError> {
    let extension = upload
        .extension()
        .filter(|_| upload.has_allowed_extension())
        .ok_or_else(|| ImageStoreError::UnsupportedType(upload.original_name.clone()))?;
    Ok(format!("{}/{}.{}", UPLOAD_FOLDER, Uuid::now_v7(), extension))
}

/// Identifiers are relative paths made of plain segments only
fn checked_relative(filename: &str) -> Result<PathBuf, ImageStoreError> {
    let path = PathBuf::from(filename);
    let plain = !filename.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if plain {
        Ok(path)
    } else {
        Err(ImageStoreError::InvalidFilename(filename.to_string()))
    }
}

/// Images kept as files under a directory that the server exposes at `public_path`
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    public_path: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, public_path: &str) -> Self {
        Self {
            root: root.into(),
            public_path: public_path.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, upload: ImageUpload) -> Result<StoredImage, ImageStoreError> {
        let filename = new_filename(&upload)?;
        let path = self.root.join(checked_relative(&filename)?);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &upload.bytes).await?;

        tracing::debug!(%filename, bytes = upload.bytes.len(), "image stored");
        Ok(StoredImage {
            url: format!("{}/{}", self.public_path, filename),
            filename,
        })
    }

    async fn delete(&self, filename: &str) -> Result<(), ImageStoreError> {
        let path = self.root.join(checked_relative(filename)?);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(%filename, "image already removed");
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }
}

/// In-process image store, used by tests and throwaway runs
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    files: Mutex<BTreeMap<String, Bytes>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.files().contains_key(filename)
    }

    pub fn len(&self) -> usize {
        self.files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn files(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Bytes>> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn upload(&self, upload: ImageUpload) -> Result<StoredImage, ImageStoreError> {
        let filename = new_filename(&upload)?;
        self.files().insert(filename.clone(), upload.bytes);
        Ok(StoredImage {
            url: format!("memory://{}", filename),
            filename,
        })
    }

    async fn delete(&self, filename: &str) -> Result<(), ImageStoreError> {
        checked_relative(filename)?;
        self.files().remove(filename);
        Ok(())
    }
}

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::Photo;

/// Errors that can occur when talking to the blob store
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Delete failed: {0}")]
    Delete(String),

    #[error("Empty image payload")]
    EmptyPayload,
}

/// A blob written to the blob store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    /// Public URL clients load the image from
    pub url: String,
    /// The blob store's own key for the object
    pub key: String,
}

impl From<StoredMedia> for Photo {
    fn from(media: StoredMedia) -> Self {
        Photo::new(media.url, media.key)
    }
}

/// Binary image storage
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `bytes` under `folder` and return where it landed
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<StoredMedia, MediaError>;

    /// Remove the blob with the given storage key
    async fn delete(&self, key: &str) -> Result<(), MediaError>;
}

/// What happened to a best-effort delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Legacy photo without a storage key; nothing was attempted
    Skipped,
    Failed(String),
}

/// Delete the blob behind `photo` without ever failing the caller.
///
/// Failures are logged and reported; an orphaned blob is acceptable.
pub async fn delete_best_effort(media: &dyn MediaStore, photo: &Photo) -> DeleteOutcome {
    let Some(key) = photo.key.as_deref() else {
        tracing::warn!("Photo {} has no storage key, leaving blob in place", photo.url);
        return DeleteOutcome::Skipped;
    };

    match media.delete(key).await {
        Ok(()) => {
            tracing::debug!("Deleted blob {}", key);
            DeleteOutcome::Deleted
        }
        Err(e) => {
            tracing::warn!("Failed to delete blob {}: {}", key, e);
            DeleteOutcome::Failed(e.to_string())
        }
    }
}

/// Process-local blob store for development and tests
pub struct InMemoryMediaStore {
    base_url: String,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryMediaStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            blobs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.blobs.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<StoredMedia, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::EmptyPayload);
        }

        let key = format!("images/{}/{}.jpeg", folder, uuid::Uuid::new_v4());
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), key);
        self.blobs.write().await.insert(key.clone(), bytes);

        Ok(StoredMedia { url, key })
    }

    async fn delete(&self, key: &str) -> Result<(), MediaError> {
        match self.blobs.write().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(MediaError::Delete(format!("no blob at {}", key))),
        }
    }
}

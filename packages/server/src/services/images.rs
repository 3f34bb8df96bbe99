//! Image lifecycle: photos are written before any record points at them and
//! removed only after no record needs them.

use std::sync::Arc;

use common::storage::{BlobStore, ObjectName, StorageError};
use tracing::{debug, warn};

use super::PatientError;

/// Raw image bytes as received from a client.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    /// Original file name, only its extension is kept.
    pub file_name: String,
    /// Declared MIME type, if the client sent one.
    pub content_type: Option<String>,
}

impl ImagePayload {
    /// Reject payloads that are not declared (or named) as images.
    pub fn validate(&self) -> Result<(), PatientError> {
        let mime = match self.content_type.as_deref().map(str::trim) {
            Some(declared) if !declared.is_empty() => declared.to_ascii_lowercase(),
            _ => mime_guess::from_path(&self.file_name)
                .first()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_default(),
        };
        if !mime.starts_with("image/") {
            return Err(PatientError::validation(
                "image",
                "image must be an image file (e.g. PNG or JPEG)",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("image payload is empty")]
    Empty,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of a best-effort image removal.
///
/// This is advisory only. It is logged by [`ImageManager::discard`] and has no
/// conversion into [`PatientError`], so it cannot fail a record operation.
#[derive(Debug)]
pub enum Cleanup {
    /// No URL, or a URL that does not point into our bucket.
    Skipped,
    Removed(ObjectName),
    /// The object was already missing.
    AlreadyGone(ObjectName),
    Failed {
        object: ObjectName,
        error: StorageError,
    },
}

#[derive(Clone)]
pub struct ImageManager {
    blobs: Arc<dyn BlobStore>,
}

impl ImageManager {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub fn blob_store(&self) -> &dyn BlobStore {
        &*self.blobs
    }

    /// Write the image under a freshly generated name and return its public URL.
    ///
    /// No retries; the caller decides what a failure means.
    pub async fn store(&self, payload: &ImagePayload) -> Result<String, UploadError> {
        if payload.bytes.is_empty() {
            return Err(UploadError::Empty);
        }

        let name = ObjectName::generate(&payload.file_name);
        let url = self.blobs.put(&name, &payload.bytes).await?;
        debug!(object = %name, size = payload.bytes.len(), "Stored image");

        Ok(url)
    }

    /// Object name referenced by a URL, if the URL points into our bucket.
    ///
    /// The object name is whatever follows `/{bucket}/`, minus any query
    /// string or fragment, and must itself be a valid flat key.
    pub fn object_name(&self, url: &str) -> Option<ObjectName> {
        let marker = format!("/{}/", self.blobs.bucket());
        let (_, rest) = url.split_once(&marker)?;
        let rest = rest.split(['?', '#']).next()?;
        ObjectName::parse(rest).ok()
    }

    /// Whether `url` references an object that currently exists in our bucket.
    pub async fn is_stored(&self, url: &str) -> Result<bool, StorageError> {
        match self.object_name(url) {
            Some(name) => self.blobs.exists(&name).await,
            None => Ok(false),
        }
    }

    /// Best-effort removal of the object behind `url`.
    pub async fn discard(&self, url: Option<&str>) -> Cleanup {
        let Some(url) = url else {
            return Cleanup::Skipped;
        };
        let Some(name) = self.object_name(url) else {
            debug!(url, "Not a stored image URL, nothing to discard");
            return Cleanup::Skipped;
        };

        match self.blobs.delete(&name).await {
            Ok(true) => {
                debug!(object = %name, "Discarded image");
                Cleanup::Removed(name)
            }
            Ok(false) => {
                debug!(object = %name, "Image already gone");
                Cleanup::AlreadyGone(name)
            }
            Err(error) => {
                warn!(object = %name, error = %error, "Failed to discard image, leaving orphan");
                Cleanup::Failed {
                    object: name,
                    error,
                }
            }
        }
    }
}

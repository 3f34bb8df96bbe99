use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::error::StorageError;
use super::name::ObjectName;
use super::traits::BlobStore;

/// Filesystem-backed object store.
///
/// Objects live at `{base_path}/{bucket}/{name}`. Writes go through a temp file
/// under `{base_path}/.tmp` and are linked into place, so a reader never sees
/// a partially written object.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    bucket: String,
    public_base_url: String,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem store, creating its directories if needed.
    pub async fn new(
        base_path: PathBuf,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        let bucket = bucket.into();
        fs::create_dir_all(base_path.join(&bucket)).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            bucket,
            public_base_url: public_base_url.into(),
            max_size,
        })
    }

    fn object_path(&self, name: &ObjectName) -> PathBuf {
        self.base_path.join(&self.bucket).join(name.as_str())
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn public_url(&self, name: &ObjectName) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            self.bucket,
            name
        )
    }

    async fn put(&self, name: &ObjectName, data: &[u8]) -> Result<String, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let object_path = self.object_path(name);
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        // Unlike rename, hard_link refuses to replace an existing target.
        let linked = fs::hard_link(&temp_path, &object_path).await;
        let _ = fs::remove_file(&temp_path).await;
        match linked {
            Ok(()) => Ok(self.public_url(name)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, name: &ObjectName) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.object_path(name)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &ObjectName) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.object_path(name)).await?)
    }

    async fn delete(&self, name: &ObjectName) -> Result<bool, StorageError> {
        match fs::remove_file(self.object_path(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

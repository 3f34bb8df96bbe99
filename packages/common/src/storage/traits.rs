use async_trait::async_trait;

use super::error::StorageError;
use super::name::ObjectName;

/// Named object storage for patient photos.
///
/// Objects are addressed by caller-generated [`ObjectName`]s inside a single
/// bucket, and every stored object is reachable at a public URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Bucket name that appears in every public URL of this store.
    fn bucket(&self) -> &str;

    /// Public URL of an object, whether or not it exists yet.
    fn public_url(&self, name: &ObjectName) -> String;

    /// Write bytes under `name` and return the object's public URL.
    ///
    /// Fails with [`StorageError::AlreadyExists`] instead of overwriting.
    async fn put(&self, name: &ObjectName, data: &[u8]) -> Result<String, StorageError>;

    /// Retrieve all bytes of an object.
    async fn get(&self, name: &ObjectName) -> Result<Vec<u8>, StorageError>;

    /// Check whether an object exists.
    async fn exists(&self, name: &ObjectName) -> Result<bool, StorageError>;

    /// Delete an object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, name: &ObjectName) -> Result<bool, StorageError>;
}

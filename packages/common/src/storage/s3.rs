use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};

use super::error::StorageError;
use super::name::ObjectName;
use super::traits::BlobStore;
use crate::config::S3Config;

/// Object store backed by an S3-compatible bucket (AWS, MinIO, Supabase Storage).
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    bucket_name: String,
    public_base_url: String,
    max_size: u64,
}

impl S3BlobStore {
    pub fn new(
        config: &S3Config,
        bucket_name: impl Into<String>,
        public_base_url: impl Into<String>,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        let bucket_name = bucket_name.into();
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid credentials: {e}")))?;

        let bucket = Bucket::new(&bucket_name, region, credentials)
            .map_err(backend_error)?
            .with_path_style();

        Ok(Self {
            bucket,
            bucket_name,
            public_base_url: public_base_url.into(),
            max_size,
        })
    }
}

fn backend_error(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn bucket(&self) -> &str {
        &self.bucket_name
    }

    fn public_url(&self, name: &ObjectName) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            self.bucket_name,
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
        if self.exists(name).await? {
            return Err(StorageError::AlreadyExists(name.to_string()));
        }

        let content_type = mime_guess::from_path(name.as_str()).first_or_octet_stream();
        let response = self
            .bucket
            .put_object_with_content_type(name.as_str(), data, content_type.as_ref())
            .await
            .map_err(backend_error)?;

        if !is_success(response.status_code()) {
            return Err(StorageError::Backend(format!(
                "upload of {name} returned HTTP {}",
                response.status_code()
            )));
        }
        Ok(self.public_url(name))
    }

    async fn get(&self, name: &ObjectName) -> Result<Vec<u8>, StorageError> {
        match self.bucket.get_object(name.as_str()).await {
            Ok(response) if is_success(response.status_code()) => Ok(response.bytes().to_vec()),
            Ok(response) if response.status_code() == 404 => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Ok(response) => Err(StorageError::Backend(format!(
                "download of {name} returned HTTP {}",
                response.status_code()
            ))),
            Err(S3Error::HttpFailWithBody(404, _)) => Err(StorageError::NotFound(name.to_string())),
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn exists(&self, name: &ObjectName) -> Result<bool, StorageError> {
        match self.bucket.head_object(name.as_str()).await {
            Ok((_, status)) if is_success(status) => Ok(true),
            Ok((_, 404)) => Ok(false),
            Ok((_, status)) => Err(StorageError::Backend(format!(
                "head of {name} returned HTTP {status}"
            ))),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(false),
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn delete(&self, name: &ObjectName) -> Result<bool, StorageError> {
        if !self.exists(name).await? {
            return Ok(false);
        }
        let response = self
            .bucket
            .delete_object(name.as_str())
            .await
            .map_err(backend_error)?;
        match response.status_code() {
            status if is_success(status) => Ok(true),
            404 => Ok(false),
            status => Err(StorageError::Backend(format!(
                "delete of {name} returned HTTP {status}"
            ))),
        }
    }
}

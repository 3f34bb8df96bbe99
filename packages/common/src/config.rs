use std::path::PathBuf;

use serde::Deserialize;

/// Which blob storage backend holds patient photos.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    S3,
}

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    /// Endpoint URL, e.g. "https://<project>.supabase.co/storage/v1/s3".
    pub endpoint: String,
    #[serde(default = "default_s3_region")]
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

fn default_s3_region() -> String {
    "us-east-1".into()
}

/// App-level blob storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Storage backend. Default: filesystem.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Bucket name. Also the path segment that marks a URL as ours. Default: "patient-images".
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Prefix of every public object URL. The object URL is `{public_base_url}/{bucket}/{name}`.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Root directory for the filesystem backend. Default: "./data/blobs".
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Maximum accepted image size in bytes. Default: 10 MiB.
    #[serde(default = "default_max_image_size")]
    pub max_image_size: u64,
    /// Required when `backend = "s3"`.
    #[serde(default)]
    pub s3: Option<S3Config>,
}

fn default_bucket() -> String {
    "patient-images".into()
}
fn default_public_base_url() -> String {
    "http://127.0.0.1:3000/storage".into()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_max_image_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: default_bucket(),
            public_base_url: default_public_base_url(),
            data_dir: default_data_dir(),
            max_image_size: default_max_image_size(),
            s3: None,
        }
    }
}

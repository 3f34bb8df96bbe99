mod error;
mod name;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

pub use error::StorageError;
pub use name::ObjectName;
pub use traits::BlobStore;

pub mod images;
pub mod patients;
pub mod search;

use crate::store::StoreError;
use images::UploadError;

/// Failure of a patient lifecycle operation.
///
/// Image cleanup failures are deliberately absent: they travel through
/// [`images::Cleanup`] and never fail an operation.
#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    /// A required field is missing or a value cannot be normalized.
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("patient {0} not found")]
    NotFound(String),

    /// The image could not be stored; no record was written.
    #[error("image upload failed: {0}")]
    Upload(#[from] UploadError),

    /// The record store failed; nothing is assumed committed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PatientError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

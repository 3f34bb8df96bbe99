use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::shared::{decode_image_data, non_blank};
use crate::services::images::ImagePayload;

const DEFAULT_FILE_NAME: &str = "image";

/// Request body for a standalone image upload.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UploadRequest {
    /// Base64 image bytes, optionally as a `data:image/...;base64,` URL.
    #[schema(example = "data:image/png;base64,iVBORw0KGgo=")]
    pub file: Option<String>,
    /// Original file name; only its extension is kept.
    #[serde(rename = "fileName")]
    #[schema(example = "smile.png")]
    pub file_name: Option<String>,
    /// Declared MIME type.
    #[serde(rename = "fileType")]
    #[schema(example = "image/png")]
    pub file_type: Option<String>,
}

impl UploadRequest {
    pub fn into_payload(self) -> Result<ImagePayload, AppError> {
        let file = non_blank(self.file)
            .ok_or_else(|| AppError::Validation("No file provided".into()))?;
        let decoded = decode_image_data(&file)?;

        Ok(ImagePayload {
            bytes: decoded.bytes,
            file_name: non_blank(self.file_name).unwrap_or_else(|| DEFAULT_FILE_NAME.into()),
            content_type: non_blank(self.file_type).or(decoded.mime),
        })
    }
}

/// Public URL of the stored image.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    #[schema(example = "http://127.0.0.1:3000/storage/patient-images/k3v9x2m1q8zt-1718000000000.png")]
    pub url: String,
}

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Deserializer};

use crate::error::AppError;

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Base64 image data with an optional `data:<mime>;base64,` prefix.
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    /// MIME type named by the data URL prefix, if there was one.
    pub mime: Option<String>,
}

pub fn decode_image_data(data: &str) -> Result<DecodedImage, AppError> {
    let data = data.trim();
    let (mime, encoded) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (meta, encoded) = rest
                .split_once(',')
                .ok_or_else(|| AppError::Validation("Malformed data URL".into()))?;
            let mime = meta
                .strip_suffix(";base64")
                .ok_or_else(|| AppError::Validation("Data URL must be base64 encoded".into()))?;
            let mime = (!mime.is_empty()).then(|| mime.to_ascii_lowercase());
            (mime, encoded)
        }
        None => (None, data),
    };

    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| AppError::Validation(format!("Image data is not valid base64: {e}")))?;

    Ok(DecodedImage { bytes, mime })
}

/// Trim an optional string, treating blank as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

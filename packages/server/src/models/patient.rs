use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::patient;
use crate::error::AppError;
use crate::models::shared::{decode_image_data, double_option, non_blank};
use crate::services::images::ImagePayload;
use crate::services::patients::{ImageEdit, NewImage, PatientDraft};

/// Age as sent by a form: either a JSON number or numeric text.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum AgeInput {
    Number(f64),
    Text(String),
}

impl AgeInput {
    fn into_text(self) -> String {
        match self {
            AgeInput::Number(n) => n.to_string(),
            AgeInput::Text(s) => s,
        }
    }
}

/// Inline image sent with a create or update.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ImageUpload {
    /// Base64 image bytes, optionally as a `data:image/...;base64,` URL.
    #[schema(example = "data:image/png;base64,iVBORw0KGgo=")]
    pub data: String,
    /// Original file name; only its extension is kept.
    #[schema(example = "smile.png")]
    pub file_name: String,
    /// MIME type. Guessed from the data URL or file name when omitted.
    #[schema(example = "image/png")]
    pub content_type: Option<String>,
}

impl ImageUpload {
    pub fn into_payload(self) -> Result<ImagePayload, AppError> {
        let decoded = decode_image_data(&self.data)?;
        Ok(ImagePayload {
            bytes: decoded.bytes,
            file_name: self.file_name,
            content_type: non_blank(self.content_type).or(decoded.mime),
        })
    }
}

/// Request body for creating a patient record.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreatePatientRequest {
    /// Patient name (required).
    #[schema(example = "Asha")]
    pub name: Option<String>,
    /// Age in whole years (required). A number or numeric string.
    #[schema(value_type = Option<i32>, example = 5)]
    pub age: Option<AgeInput>,
    #[schema(example = "Meera")]
    pub parent_name: Option<String>,
    #[schema(example = "OP-101")]
    pub op_number: Option<String>,
    /// Phone or address (required).
    #[schema(example = "555-0100")]
    pub contact_details: Option<String>,
    #[schema(example = "Fluoride varnish")]
    pub treatment: Option<String>,
    pub notes: Option<String>,
    /// URL returned by `POST /api/v1/upload`. Mutually exclusive with `image`.
    pub image_url: Option<String>,
    /// Image to upload with the record. Mutually exclusive with `image_url`.
    pub image: Option<ImageUpload>,
}

impl CreatePatientRequest {
    pub fn into_parts(self) -> Result<(PatientDraft, NewImage), AppError> {
        let image = match (self.image, non_blank(self.image_url)) {
            (Some(_), Some(_)) => return Err(both_images()),
            (Some(upload), None) => NewImage::Upload(upload.into_payload()?),
            (None, Some(url)) => NewImage::Link(url),
            (None, None) => NewImage::None,
        };

        let draft = PatientDraft {
            name: self.name,
            age: self.age.map(AgeInput::into_text),
            parent_name: self.parent_name,
            op_number: self.op_number,
            contact_details: self.contact_details,
            treatment: self.treatment,
            notes: self.notes,
        };
        Ok((draft, image))
    }
}

/// Request body for updating a patient record.
///
/// All record fields are replaced. `image_url` follows PATCH semantics:
/// absent keeps the current image, `null` removes it, a value links a
/// previously uploaded image.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdatePatientRequest {
    #[schema(example = "Asha")]
    pub name: Option<String>,
    #[schema(value_type = Option<i32>, example = 6)]
    pub age: Option<AgeInput>,
    pub parent_name: Option<String>,
    pub op_number: Option<String>,
    #[schema(example = "555-0100")]
    pub contact_details: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
    pub image: Option<ImageUpload>,
}

impl UpdatePatientRequest {
    pub fn into_parts(self) -> Result<(PatientDraft, ImageEdit), AppError> {
        let image = match (self.image, self.image_url) {
            (Some(_), Some(_)) => return Err(both_images()),
            (Some(upload), None) => ImageEdit::Upload(upload.into_payload()?),
            (None, Some(url)) => match non_blank(url) {
                Some(url) => ImageEdit::Link(url),
                None => ImageEdit::Clear,
            },
            (None, None) => ImageEdit::Keep,
        };

        let draft = PatientDraft {
            name: self.name,
            age: self.age.map(AgeInput::into_text),
            parent_name: self.parent_name,
            op_number: self.op_number,
            contact_details: self.contact_details,
            treatment: self.treatment,
            notes: self.notes,
        };
        Ok((draft, image))
    }
}

fn both_images() -> AppError {
    AppError::Validation("Provide either image or image_url, not both".into())
}

/// Query parameters for listing patients.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientListQuery {
    /// Case-insensitive match on name, parent name, OP number or age.
    pub search: Option<String>,
}

/// A patient record.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PatientResponse {
    pub id: Uuid,
    #[schema(example = "Asha")]
    pub name: String,
    #[schema(example = 5)]
    pub age: i32,
    pub parent_name: Option<String>,
    pub op_number: Option<String>,
    #[schema(example = "555-0100")]
    pub contact_details: String,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<patient::Model> for PatientResponse {
    fn from(m: patient::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            age: m.age,
            parent_name: m.parent_name,
            op_number: m.op_number,
            contact_details: m.contact_details,
            treatment: m.treatment,
            notes: m.notes,
            image_url: m.image_url,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

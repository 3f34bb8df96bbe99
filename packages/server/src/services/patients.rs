//! Record lifecycle: validation, normalization and the ordering of record and
//! image writes.
//!
//! Every operation follows a fixed protocol:
//!
//! * **create**: validate, store the image, insert the record. If the insert
//!   fails the freshly stored image is discarded.
//! * **update**: validate, confirm the record exists, store the new image,
//!   write the record, and only then discard the image the record used to
//!   reference. If the write fails the new image is discarded and the old one
//!   is left untouched.
//! * **delete**: confirm the record exists, delete it, and only then discard
//!   its image.
//!
//! Image removal is advisory (see [`Cleanup`](super::images::Cleanup)) and
//! never turns a successful record write into a failure.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::PatientError;
use super::images::{ImageManager, ImagePayload};
use super::search;
use crate::entity::patient;
use crate::store::{ImageUrlChange, PatientFields, PatientStore};

/// Patient fields as submitted, before validation.
#[derive(Debug, Clone, Default)]
pub struct PatientDraft {
    pub name: Option<String>,
    /// Raw age text, normalized to an integer during validation.
    pub age: Option<String>,
    pub parent_name: Option<String>,
    pub op_number: Option<String>,
    pub contact_details: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}

/// Image to attach to a new record.
#[derive(Debug, Clone, Default)]
pub enum NewImage {
    #[default]
    None,
    /// Raw bytes, stored before the record is inserted.
    Upload(ImagePayload),
    /// URL of an image previously stored through the standalone upload.
    Link(String),
}

/// What an update does to the record's image.
#[derive(Debug, Clone, Default)]
pub enum ImageEdit {
    #[default]
    Keep,
    Clear,
    Upload(ImagePayload),
    Link(String),
}

#[derive(Clone)]
pub struct PatientService {
    records: Arc<dyn PatientStore>,
    images: ImageManager,
}

impl PatientService {
    pub fn new(records: Arc<dyn PatientStore>, images: ImageManager) -> Self {
        Self { records, images }
    }

    pub fn images(&self) -> &ImageManager {
        &self.images
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<patient::Model>, PatientError> {
        Ok(self.records.all().await?)
    }

    /// Records matching `query`, newest first. See [`search::filter`].
    pub async fn search(&self, query: &str) -> Result<Vec<patient::Model>, PatientError> {
        let all = self.records.all().await?;
        Ok(search::filter(&all, query).into_iter().cloned().collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<patient::Model, PatientError> {
        self.records
            .get(id)
            .await?
            .ok_or_else(|| PatientError::NotFound(id.to_string()))
    }

    pub async fn create(
        &self,
        draft: PatientDraft,
        image: NewImage,
    ) -> Result<patient::Model, PatientError> {
        let fields = validate(draft)?;

        let (image_url, uploaded) = match image {
            NewImage::None => (None, None),
            NewImage::Upload(payload) => {
                payload.validate()?;
                let url = self.images.store(&payload).await?;
                (Some(url.clone()), Some(url))
            }
            NewImage::Link(url) => {
                self.ensure_linkable(&url).await?;
                (Some(url), None)
            }
        };

        match self.records.insert(fields, image_url).await {
            Ok(created) => {
                info!(patient_id = %created.id, has_image = created.image_url.is_some(), "Patient created");
                Ok(created)
            }
            Err(err) => {
                warn!(error = %err, "Patient insert failed");
                self.images.discard(uploaded.as_deref()).await;
                Err(err.into())
            }
        }
    }

    pub async fn update(
        &self,
        id: Uuid,
        draft: PatientDraft,
        image: ImageEdit,
    ) -> Result<patient::Model, PatientError> {
        let fields = validate(draft)?;

        // Checked before any upload so a missing record never leaves an orphan.
        let existing = self.get(id).await?;
        let old_image_url = existing.image_url;

        let (change, uploaded) = match image {
            ImageEdit::Keep => (ImageUrlChange::Keep, None),
            ImageEdit::Clear => (ImageUrlChange::Set(None), None),
            ImageEdit::Upload(payload) => {
                payload.validate()?;
                let url = self.images.store(&payload).await?;
                (ImageUrlChange::Set(Some(url.clone())), Some(url))
            }
            ImageEdit::Link(url) => {
                if old_image_url.as_deref() != Some(url.as_str()) {
                    self.ensure_linkable(&url).await?;
                }
                (ImageUrlChange::Set(Some(url)), None)
            }
        };

        let updated = match self.records.update(id, fields, change).await {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                warn!(patient_id = %id, "Patient vanished during update, discarding uploaded image");
                self.images.discard(uploaded.as_deref()).await;
                return Err(PatientError::NotFound(id.to_string()));
            }
            Err(err) => {
                warn!(patient_id = %id, error = %err, "Patient update failed");
                self.images.discard(uploaded.as_deref()).await;
                return Err(err.into());
            }
        };

        // The write is confirmed; the old image is no longer referenced.
        if old_image_url.is_some() && old_image_url != updated.image_url {
            self.images.discard(old_image_url.as_deref()).await;
        }

        info!(patient_id = %updated.id, "Patient updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<patient::Model, PatientError> {
        // The record is the only index from id to image URL.
        self.get(id).await?;

        let deleted = self
            .records
            .delete(id)
            .await?
            .ok_or_else(|| PatientError::NotFound(id.to_string()))?;

        self.images.discard(deleted.image_url.as_deref()).await;

        info!(patient_id = %deleted.id, "Patient deleted");
        Ok(deleted)
    }

    /// A linked URL must name a stored image that no record references yet.
    /// Every image has at most one owning record.
    async fn ensure_linkable(&self, url: &str) -> Result<(), PatientError> {
        let stored = self
            .images
            .is_stored(url)
            .await
            .map_err(|e| PatientError::Upload(e.into()))?;
        if !stored {
            return Err(PatientError::validation(
                "image_url",
                "image_url does not reference a stored image",
            ));
        }

        if let Some(owner) = self.records.find_by_image_url(url).await? {
            warn!(patient_id = %owner.id, "Rejected link to an image another record uses");
            return Err(PatientError::validation(
                "image_url",
                "image_url is already used by another patient record",
            ));
        }
        Ok(())
    }
}

/// Check required fields and normalize the draft into storable values.
///
/// Blank optional fields become absent.
pub fn validate(draft: PatientDraft) -> Result<PatientFields, PatientError> {
    let name = required(draft.name, "name")?;
    let age = required(draft.age, "age")?;
    let contact_details = required(draft.contact_details, "contact_details")?;

    let age = parse_age(&age).ok_or_else(|| {
        PatientError::validation("age", format!("age must be a number, got '{age}'"))
    })?;

    Ok(PatientFields {
        name,
        age,
        parent_name: optional(draft.parent_name),
        op_number: optional(draft.op_number),
        contact_details,
        treatment: optional(draft.treatment),
        notes: optional(draft.notes),
    })
}

/// Leading integer of `text`, so `"5.5"` and `"5 years"` both read as 5.
/// Text that does not start with digits (after an optional sign) is rejected.
fn parse_age(text: &str) -> Option<i32> {
    let digits_from = usize::from(text.starts_with(['-', '+']));
    let digits_len = text[digits_from..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    text[..digits_from + digits_len].parse().ok()
}

fn required(value: Option<String>, field: &'static str) -> Result<String, PatientError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(PatientError::validation(field, format!("{field} is required"))),
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

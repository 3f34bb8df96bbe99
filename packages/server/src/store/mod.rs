//! Record store: persistence of patient rows.
//!
//! The lifecycle services only talk to [`PatientStore`]; the database and
//! in-process implementations are interchangeable behind it.

mod database;
mod memory;

use async_trait::async_trait;
use sea_orm::DbErr;
use uuid::Uuid;

use crate::entity::patient;

pub use database::DatabasePatientStore;
pub use memory::MemoryPatientStore;

/// Validated, normalized field values of a patient, excluding the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientFields {
    pub name: String,
    pub age: i32,
    pub parent_name: Option<String>,
    pub op_number: Option<String>,
    pub contact_details: String,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}

/// What an update does to the stored `image_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageUrlChange {
    /// Leave the column untouched.
    Keep,
    /// Overwrite the column, `None` clears it.
    Set(Option<String>),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Insert a new record. The store assigns `id`, `created_at` and `updated_at`.
    async fn insert(
        &self,
        fields: PatientFields,
        image_url: Option<String>,
    ) -> Result<patient::Model, StoreError>;

    /// Overwrite a record's fields. Returns `None` if no record has this id.
    async fn update(
        &self,
        id: Uuid,
        fields: PatientFields,
        image_url: ImageUrlChange,
    ) -> Result<Option<patient::Model>, StoreError>;

    /// Remove a record and return its last state. Returns `None` if absent.
    async fn delete(&self, id: Uuid) -> Result<Option<patient::Model>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<patient::Model>, StoreError>;

    /// Any record whose `image_url` is exactly `image_url`.
    async fn find_by_image_url(
        &self,
        image_url: &str,
    ) -> Result<Option<patient::Model>, StoreError>;

    /// All records, newest `created_at` first.
    async fn all(&self) -> Result<Vec<patient::Model>, StoreError>;
}

/// Next `updated_at` for a record: now, but strictly after the previous value
/// even if the clock has not advanced.
pub(crate) fn next_updated_at(
    previous: chrono::DateTime<chrono::Utc>,
) -> chrono::DateTime<chrono::Utc> {
    use chrono::SubsecRound;

    // Postgres keeps microseconds, so compare at that precision.
    let now = chrono::Utc::now().trunc_subsecs(6);
    if now > previous {
        now
    } else {
        previous + chrono::Duration::microseconds(1)
    }
}

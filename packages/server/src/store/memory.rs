use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ImageUrlChange, PatientFields, PatientStore, StoreError, next_updated_at};
use crate::entity::patient;

/// In-process record store, used with `database.url = "memory://"`.
///
/// Rows are kept newest-first so `all()` needs no sort. Contents are lost on
/// restart.
#[derive(Default)]
pub struct MemoryPatientStore {
    rows: RwLock<Vec<patient::Model>>,
}

impl MemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatientStore for MemoryPatientStore {
    async fn insert(
        &self,
        fields: PatientFields,
        image_url: Option<String>,
    ) -> Result<patient::Model, StoreError> {
        let mut rows = self.rows.write().await;

        let mut now = Utc::now();
        if let Some(newest) = rows.first()
            && newest.created_at >= now
        {
            now = next_updated_at(newest.created_at);
        }

        let model = patient::Model {
            id: Uuid::now_v7(),
            name: fields.name,
            age: fields.age,
            parent_name: fields.parent_name,
            op_number: fields.op_number,
            contact_details: fields.contact_details,
            treatment: fields.treatment,
            notes: fields.notes,
            image_url,
            created_at: now,
            updated_at: now,
        };
        rows.insert(0, model.clone());
        Ok(model)
    }

    async fn update(
        &self,
        id: Uuid,
        fields: PatientFields,
        image_url: ImageUrlChange,
    ) -> Result<Option<patient::Model>, StoreError> {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };

        row.name = fields.name;
        row.age = fields.age;
        row.parent_name = fields.parent_name;
        row.op_number = fields.op_number;
        row.contact_details = fields.contact_details;
        row.treatment = fields.treatment;
        row.notes = fields.notes;
        if let ImageUrlChange::Set(url) = image_url {
            row.image_url = url;
        }
        row.updated_at = next_updated_at(row.updated_at);

        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<patient::Model>, StoreError> {
        let mut rows = self.rows.write().await;
        let removed = rows
            .iter()
            .position(|r| r.id == id)
            .map(|index| rows.remove(index));
        Ok(removed)
    }

    async fn get(&self, id: Uuid) -> Result<Option<patient::Model>, StoreError> {
        Ok(self.rows.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_image_url(
        &self,
        image_url: &str,
    ) -> Result<Option<patient::Model>, StoreError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|r| r.image_url.as_deref() == Some(image_url))
            .cloned())
    }

    async fn all(&self) -> Result<Vec<patient::Model>, StoreError> {
        Ok(self.rows.read().await.clone())
    }
}

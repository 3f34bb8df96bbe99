use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use super::{ImageUrlChange, PatientFields, PatientStore, StoreError, next_updated_at};
use crate::entity::patient;

/// Record store backed by the `patient` table.
#[derive(Clone)]
pub struct DatabasePatientStore {
    db: DatabaseConnection,
}

impl DatabasePatientStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PatientStore for DatabasePatientStore {
    async fn insert(
        &self,
        fields: PatientFields,
        image_url: Option<String>,
    ) -> Result<patient::Model, StoreError> {
        let now = Utc::now().trunc_subsecs(6);
        let new_patient = patient::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(fields.name),
            age: Set(fields.age),
            parent_name: Set(fields.parent_name),
            op_number: Set(fields.op_number),
            contact_details: Set(fields.contact_details),
            treatment: Set(fields.treatment),
            notes: Set(fields.notes),
            image_url: Set(image_url),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(new_patient.insert(&self.db).await?)
    }

    async fn update(
        &self,
        id: Uuid,
        fields: PatientFields,
        image_url: ImageUrlChange,
    ) -> Result<Option<patient::Model>, StoreError> {
        let txn = self.db.begin().await?;

        let Some(existing) = patient::Entity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };
        let updated_at = next_updated_at(existing.updated_at);

        let mut active: patient::ActiveModel = existing.into();
        active.name = Set(fields.name);
        active.age = Set(fields.age);
        active.parent_name = Set(fields.parent_name);
        active.op_number = Set(fields.op_number);
        active.contact_details = Set(fields.contact_details);
        active.treatment = Set(fields.treatment);
        active.notes = Set(fields.notes);
        if let ImageUrlChange::Set(url) = image_url {
            active.image_url = Set(url);
        }
        active.updated_at = Set(updated_at);

        let model = active.update(&txn).await?;
        txn.commit().await?;

        Ok(Some(model))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<patient::Model>, StoreError> {
        let txn = self.db.begin().await?;

        let Some(existing) = patient::Entity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };
        patient::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        Ok(Some(existing))
    }

    async fn get(&self, id: Uuid) -> Result<Option<patient::Model>, StoreError> {
        Ok(patient::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_image_url(
        &self,
        image_url: &str,
    ) -> Result<Option<patient::Model>, StoreError> {
        Ok(patient::Entity::find()
            .filter(patient::Column::ImageUrl.eq(image_url))
            .one(&self.db)
            .await?)
    }

    async fn all(&self) -> Result<Vec<patient::Model>, StoreError> {
        // UUIDv7 ids are time-ordered, which breaks created_at ties newest-first.
        Ok(patient::Entity::find()
            .order_by_desc(patient::Column::CreatedAt)
            .order_by_desc(patient::Column::Id)
            .all(&self.db)
            .await?)
    }
}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A patient row. `image_url`, when set, references an object in the blob store.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "patient")]
pub struct Model {
    /// UUIDv7 primary key, assigned on insert and never reused.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,
    pub age: i32,
    pub parent_name: Option<String>,

    /// Clinic-internal OP reference code.
    pub op_number: Option<String>,

    pub contact_details: String,
    pub treatment: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub image_url: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;

/// Upstream image-generation endpoint selectable per task.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "model_config")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub api_base_url: String,
    pub api_key: String,
    pub model: String,
    pub default_width: i32,
    pub default_height: i32,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { panic!("no relations defined here") }
}

impl ActiveModelBehavior for ActiveModel {}

pub struct NewModelConfig {
    pub name: String,
    pub api_base_url: String,
    pub api_key: String,
    pub model: String,
    pub default_width: i32,
    pub default_height: i32,
}

pub async fn create(db: &DatabaseConnection, input: NewModelConfig) -> Result<Model, errors::ModelError> {
    if input.name.trim().is_empty() {
        return Err(errors::ModelError::Validation("name required".into()));
    }
    if !input.api_base_url.starts_with("http://") && !input.api_base_url.starts_with("https://") {
        return Err(errors::ModelError::Validation("api_base_url must be http(s)".into()));
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name),
        api_base_url: Set(input.api_base_url),
        api_key: Set(input.api_key),
        model: Set(input.model),
        default_width: Set(input.default_width),
        default_height: Set(input.default_height),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn find_active(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, errors::ModelError> {
    Entity::find_by_id(id)
        .filter(Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

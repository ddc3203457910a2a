use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use models::model_config::{self, NewModelConfig};

use crate::errors::ServiceError;

/// Partial update; None leaves the column untouched.
#[derive(Debug, Default)]
pub struct ModelConfigUpdate {
    pub name: Option<String>,
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub default_width: Option<i32>,
    pub default_height: Option<i32>,
    pub is_active: Option<bool>,
}

pub async fn create_model_config(
    db: &DatabaseConnection,
    input: NewModelConfig,
) -> Result<model_config::Model, ServiceError> {
    let created = model_config::create(db, input).await?;
    tracing::info!(model_config_id = %created.id, name = %created.name, "model config created");
    Ok(created)
}

pub async fn get_model_config(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<model_config::Model>, ServiceError> {
    model_config::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn list_model_configs(db: &DatabaseConnection) -> Result<Vec<model_config::Model>, ServiceError> {
    model_config::Entity::find()
        .order_by_asc(model_config::Column::Name)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn update_model_config(
    db: &DatabaseConnection,
    id: Uuid,
    update: ModelConfigUpdate,
) -> Result<model_config::Model, ServiceError> {
    if let Some(url) = &update.api_base_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ServiceError::Validation("api_base_url must be http(s)".into()));
        }
    }
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(ServiceError::Validation("name required".into()));
        }
    }
    let found = model_config::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("model config"))?;
    let mut am: model_config::ActiveModel = found.into();
    if let Some(v) = update.name {
        am.name = Set(v);
    }
    if let Some(v) = update.api_base_url {
        am.api_base_url = Set(v);
    }
    if let Some(v) = update.api_key {
        am.api_key = Set(v);
    }
    if let Some(v) = update.model {
        am.model = Set(v);
    }
    if let Some(v) = update.default_width {
        am.default_width = Set(v);
    }
    if let Some(v) = update.default_height {
        am.default_height = Set(v);
    }
    if let Some(v) = update.is_active {
        am.is_active = Set(v);
    }
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn delete_model_config(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    let res = model_config::Entity::delete_by_id(id)
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("model config"));
    }
    Ok(())
}

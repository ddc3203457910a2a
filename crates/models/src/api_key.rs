use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;
use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "api_key")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub key_digest: String,
    pub label: String,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub last_used_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    User,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create(
    db: &DatabaseConnection,
    user_id: Uuid,
    key_digest: &str,
    label: &str,
) -> Result<Model, errors::ModelError> {
    if key_digest.len() < 12 {
        return Err(errors::ModelError::Validation("key_digest too short".into()));
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        key_digest: Set(key_digest.to_string()),
        label: Set(label.to_string()),
        status: Set("active".into()),
        created_at: Set(Utc::now().into()),
        last_used_at: Set(None),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn find_active_by_digest(
    db: &DatabaseConnection,
    key_digest: &str,
) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::KeyDigest.eq(key_digest))
        .filter(Column::Status.eq("active"))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn touch_last_used(db: &DatabaseConnection, id: Uuid) -> Result<(), errors::ModelError> {
    let found = Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))?
        .ok_or_else(|| errors::ModelError::Validation("api key not found".into()))?;
    let mut am: ActiveModel = found.into();
    am.last_used_at = Set(Some(Utc::now().into()));
    am.update(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))?;
    Ok(())
}

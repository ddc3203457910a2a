use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;
use crate::{model_config, user};

/// Generation task lifecycle. Stored as a string column; `parse` is the only
/// way a raw value enters the enum.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, errors::ModelError> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "processing" => Ok(TaskStatus::Processing),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(errors::ModelError::Validation(format!("unknown task status: {other}"))),
        }
    }

    /// Only pending tasks may enter the worker.
    pub fn can_process(self) -> bool {
        self == TaskStatus::Pending
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "task")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub model_config_id: Option<Uuid>,
    pub prompt: String,
    pub status: String,
    pub width: i32,
    pub height: i32,
    pub style: Option<String>,
    pub image_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn status(&self) -> Result<TaskStatus, errors::ModelError> {
        TaskStatus::parse(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    User,
    ModelConfig,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
            Relation::ModelConfig => Entity::belongs_to(model_config::Entity)
                .from(Column::ModelConfigId)
                .to(model_config::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub struct NewTask {
    pub prompt: String,
    pub width: i32,
    pub height: i32,
    pub style: Option<String>,
    pub user_id: Option<Uuid>,
    pub model_config_id: Option<Uuid>,
}

pub async fn create(db: &DatabaseConnection, input: NewTask) -> Result<Model, errors::ModelError> {
    if input.prompt.trim().is_empty() {
        return Err(errors::ModelError::Validation("prompt required".into()));
    }
    if input.prompt.chars().count() > 1000 {
        return Err(errors::ModelError::Validation("prompt too long (<=1000 chars)".into()));
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(input.user_id),
        model_config_id: Set(input.model_config_id),
        prompt: Set(input.prompt),
        status: Set(TaskStatus::Pending.as_str().into()),
        width: Set(input.width),
        height: Set(input.height),
        style: Set(input.style),
        image_url: Set(None),
        error_message: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod status_tests {
    use super::TaskStatus;

    #[test]
    fn parse_round_trips() {
        for s in [
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            assert_eq!(TaskStatus::parse(s.as_str()).unwrap(), s);
        }
    }

    #[test]
    fn parse_rejects_foreign_values() {
        assert!(TaskStatus::parse("done").is_err());
        assert!(TaskStatus::parse("").is_err());
    }

    #[test]
    fn lifecycle_predicates() {
        assert!(TaskStatus::Pending.can_process());
        assert!(!TaskStatus::Processing.can_process());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }
}

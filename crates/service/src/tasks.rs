use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use uuid::Uuid;

use common::pagination::Pagination;
use models::task::{self, NewTask, TaskStatus};

use crate::errors::ServiceError;

/// Ownership slice for task listings. Anonymous callers only ever see the
/// NULL-owner slice; admins may ask for any.
#[derive(Clone, Copy, Debug)]
pub enum OwnerFilter {
    Any,
    Anonymous,
    User(Uuid),
}

#[derive(Clone, Debug, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub owner: Option<OwnerFilter>,
}

impl Default for OwnerFilter {
    fn default() -> Self {
        OwnerFilter::Any
    }
}

/// Create a new pending task.
pub async fn create_task(db: &DatabaseConnection, input: NewTask) -> Result<task::Model, ServiceError> {
    let created = task::create(db, input).await?;
    tracing::info!(task_id = %created.id, "task created");
    Ok(created)
}

/// Get a task by id.
pub async fn get_task(db: &DatabaseConnection, id: Uuid) -> Result<Option<task::Model>, ServiceError> {
    let found = task::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(found)
}

/// Delete a task; NotFound when the id is unknown.
pub async fn delete_task(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    let res = task::Entity::delete_by_id(id)
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("task"));
    }
    tracing::info!(task_id = %id, "task deleted");
    Ok(())
}

fn filtered(filter: &TaskFilter) -> sea_orm::Select<task::Entity> {
    let mut query = task::Entity::find();
    if let Some(status) = filter.status {
        query = query.filter(task::Column::Status.eq(status.as_str()));
    }
    match filter.owner.unwrap_or_default() {
        OwnerFilter::Any => {}
        OwnerFilter::Anonymous => {
            query = query.filter(task::Column::UserId.is_null());
        }
        OwnerFilter::User(uid) => {
            query = query.filter(task::Column::UserId.eq(uid));
        }
    }
    query
}

/// List tasks newest-first with the filter applied to both rows and total.
pub async fn list_tasks(
    db: &DatabaseConnection,
    filter: &TaskFilter,
    opts: Pagination,
) -> Result<(u64, Vec<task::Model>), ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let total = filtered(filter)
        .count(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    let rows = filtered(filter)
        .order_by_desc(task::Column::CreatedAt)
        .paginate(db, per_page)
        .fetch_page(page_idx)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok((total, rows))
}

async fn transition(
    db: &DatabaseConnection,
    id: Uuid,
    status: TaskStatus,
    image_url: Option<String>,
    error_message: Option<String>,
) -> Result<task::Model, ServiceError> {
    let found = task::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("task"))?;
    let mut am: task::ActiveModel = found.into();
    am.status = Set(status.as_str().into());
    if let Some(url) = image_url {
        am.image_url = Set(Some(url));
    }
    if let Some(msg) = error_message {
        am.error_message = Set(Some(msg));
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    tracing::info!(task_id = %id, status = %status, "task transition");
    Ok(updated)
}

/// Move a pending task into processing.
pub async fn mark_processing(db: &DatabaseConnection, id: Uuid) -> Result<task::Model, ServiceError> {
    transition(db, id, TaskStatus::Processing, None, None).await
}

/// Terminal success: completed always carries the image URL.
pub async fn mark_completed(
    db: &DatabaseConnection,
    id: Uuid,
    image_url: String,
) -> Result<task::Model, ServiceError> {
    if image_url.trim().is_empty() {
        return Err(ServiceError::Validation("image_url required for completed".into()));
    }
    transition(db, id, TaskStatus::Completed, Some(image_url), None).await
}

/// Terminal failure: failed always carries the error message.
pub async fn mark_failed(
    db: &DatabaseConnection,
    id: Uuid,
    error_message: String,
) -> Result<task::Model, ServiceError> {
    let msg = if error_message.trim().is_empty() { "unknown error".to_string() } else { error_message };
    transition(db, id, TaskStatus::Failed, None, Some(msg)).await
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct TaskStats {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Per-status counts for the status endpoint.
pub async fn task_stats(db: &DatabaseConnection) -> Result<TaskStats, ServiceError> {
    let count = |status: Option<TaskStatus>| async move {
        let mut query = task::Entity::find();
        if let Some(s) = status {
            query = query.filter(task::Column::Status.eq(s.as_str()));
        }
        query.count(db).await.map_err(|e| ServiceError::Db(e.to_string()))
    };
    Ok(TaskStats {
        total: count(None).await?,
        pending: count(Some(TaskStatus::Pending)).await?,
        processing: count(Some(TaskStatus::Processing)).await?,
        completed: count(Some(TaskStatus::Completed)).await?,
        failed: count(Some(TaskStatus::Failed)).await?,
    })
}

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::warn;
use uuid::Uuid;

use common::pagination::Pagination;
use models::task;
use models::task::TaskStatus;
use service::tasks::{self, OwnerFilter, TaskFilter};

use crate::errors::ApiError;
use crate::extract::CurrentUser;
use crate::schemas::{TaskListQuery, TaskListResponse, TaskResponse};
use crate::state::AppState;

/// Non-admins only ever see their own slice; admins may filter any user.
fn owner_filter(current_user: &CurrentUser, requested: Option<Uuid>) -> OwnerFilter {
    match current_user {
        CurrentUser::Authenticated { is_admin: true, .. } => match requested {
            Some(uid) => OwnerFilter::User(uid),
            None => OwnerFilter::Any,
        },
        CurrentUser::Authenticated { user_id, .. } => OwnerFilter::User(*user_id),
        CurrentUser::Anonymous => OwnerFilter::Anonymous,
    }
}

fn may_access(current_user: &CurrentUser, t: &task::Model) -> bool {
    match current_user {
        CurrentUser::Authenticated { is_admin: true, .. } => true,
        CurrentUser::Authenticated { user_id, .. } => t.user_id == Some(*user_id),
        CurrentUser::Anonymous => t.user_id.is_none(),
    }
}

pub async fn list_tasks(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(q): Query<TaskListQuery>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let status = match &q.status {
        Some(raw) => Some(TaskStatus::parse(raw).map_err(|e| ApiError::bad_request(e.to_string()))?),
        None => None,
    };
    let filter = TaskFilter { status, owner: Some(owner_filter(&current_user, q.user_id)) };
    let opts = Pagination { page: q.page, per_page: q.limit };
    let (total, rows) = tasks::list_tasks(&state.db, &filter, opts).await?;
    let tasks = rows.into_iter().map(TaskResponse::from).collect();
    Ok(Json(TaskListResponse::new(total, q.page.max(1), q.limit, tasks)))
}

pub async fn get_task(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskResponse>, ApiError> {
    let found = tasks::get_task(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("task not found: {id}")))?;
    if !may_access(&current_user, &found) {
        warn!(task_id = %id, "task access denied");
        return Err(ApiError::forbidden("not allowed to view this task"));
    }
    Ok(Json(TaskResponse::from(found)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let found = tasks::get_task(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("task not found: {id}")))?;
    if !may_access(&current_user, &found) {
        warn!(task_id = %id, "task delete denied");
        return Err(ApiError::forbidden("not allowed to delete this task"));
    }
    tasks::delete_task(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

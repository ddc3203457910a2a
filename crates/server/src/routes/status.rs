use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::error;

use service::images::StorageInfo;
use service::tasks::{self, TaskStats};

use crate::errors::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

#[derive(Serialize)]
pub struct GeneratorStatus {
    pub configured: bool,
    pub connected: bool,
    pub model: String,
}

#[derive(Serialize)]
pub struct CurrentUserStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<uuid::Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub authenticated: bool,
    pub admin: bool,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub timestamp: String,
    pub status: &'static str,
    pub tasks: TaskStats,
    pub storage: StorageInfo,
    pub generator: GeneratorStatus,
    pub current_user: CurrentUserStatus,
}

/// Operational snapshot: task counts, storage usage, upstream connectivity.
pub async fn get_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<StatusResponse>, ApiError> {
    let task_stats = tasks::task_stats(&state.db).await.unwrap_or_else(|e| {
        error!(error = %e, "task stats unavailable");
        TaskStats::default()
    });
    let storage = state.images.storage_info().await?;

    let configured = state.generator.is_configured();
    let connected = if configured { state.generator.test_connection().await } else { false };

    let (id, email, authenticated, admin) = match &current_user {
        CurrentUser::Authenticated { user_id, email, is_admin, .. } => {
            (Some(*user_id), Some(email.clone()), true, *is_admin)
        }
        CurrentUser::Anonymous => (None, None, false, false),
    };

    Ok(Json(StatusResponse {
        timestamp: Utc::now().to_rfc3339(),
        status: "running",
        tasks: task_stats,
        storage,
        generator: GeneratorStatus {
            configured,
            connected,
            model: state.generator.model().to_string(),
        },
        current_user: CurrentUserStatus { id, email, authenticated, admin },
    }))
}

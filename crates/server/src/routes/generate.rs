use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::info;

use models::task::NewTask;
use service::errors::ServiceError;
use service::{tasks, worker};

use crate::errors::ApiError;
use crate::extract::{client_ip, CurrentUser};
use crate::schemas::{
    BatchGenerateRequest, BatchGenerateResponse, GenerateRequest, GenerateResponse,
};
use crate::state::AppState;

/// Accept a generation request, enqueue the task and return 201 immediately.
/// The image is produced by the background worker.
pub async fn generate_image(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    current_user: CurrentUser,
    headers: HeaderMap,
    Json(input): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerateResponse>), ApiError> {
    let input = input.validated().map_err(ApiError::bad_request)?;

    let ip = client_ip(&headers, addr);
    if !state.limiter.check(&ip) {
        return Err(ServiceError::RateLimited.into());
    }

    if let Some(mc_id) = input.model_config_id {
        let active = models::model_config::find_active(&state.db, mc_id)
            .await
            .map_err(ServiceError::from)?;
        if active.is_none() {
            return Err(ApiError::bad_request("unknown or inactive model_config_id"));
        }
    }

    let task = tasks::create_task(
        &state.db,
        NewTask {
            prompt: input.prompt,
            width: input.width,
            height: input.height,
            style: input.style,
            user_id: current_user.user_id(),
            model_config_id: input.model_config_id,
        },
    )
    .await?;
    info!(task_id = %task.id, %ip, "generation accepted");

    worker::spawn(state.worker_context(), task.id);

    Ok((StatusCode::CREATED, Json(GenerateResponse::accepted(&task))))
}

/// Batch variant: one task per prompt, all spawned independently.
pub async fn generate_batch(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    current_user: CurrentUser,
    headers: HeaderMap,
    Json(input): Json<BatchGenerateRequest>,
) -> Result<(StatusCode, Json<BatchGenerateResponse>), ApiError> {
    let input = input.validated().map_err(ApiError::bad_request)?;

    let ip = client_ip(&headers, addr);
    if !state.limiter.check(&ip) {
        return Err(ServiceError::RateLimited.into());
    }

    let mut responses = Vec::with_capacity(input.prompts.len());
    for prompt in input.prompts {
        let task = tasks::create_task(
            &state.db,
            NewTask {
                prompt,
                width: input.width,
                height: input.height,
                style: None,
                user_id: current_user.user_id(),
                model_config_id: None,
            },
        )
        .await?;
        worker::spawn(state.worker_context(), task.id);
        responses.push(GenerateResponse::accepted(&task));
    }
    info!(count = responses.len(), %ip, "batch generation accepted");

    Ok((
        StatusCode::CREATED,
        Json(BatchGenerateResponse { total: responses.len(), tasks: responses }),
    ))
}

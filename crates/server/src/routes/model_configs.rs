use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use models::model_config::NewModelConfig;
use service::model_configs::{self, ModelConfigUpdate};

use crate::errors::ApiError;
use crate::extract::CurrentUser;
use crate::schemas::{ModelConfigInput, ModelConfigResponse};
use crate::state::AppState;

pub async fn list_model_configs(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<Vec<ModelConfigResponse>>, ApiError> {
    current_user.require_admin()?;
    let rows = model_configs::list_model_configs(&state.db).await?;
    Ok(Json(rows.into_iter().map(ModelConfigResponse::from).collect()))
}

pub async fn create_model_config(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ModelConfigInput>,
) -> Result<(StatusCode, Json<ModelConfigResponse>), ApiError> {
    current_user.require_admin()?;
    let created = model_configs::create_model_config(
        &state.db,
        NewModelConfig {
            name: input.name,
            api_base_url: input.api_base_url,
            api_key: input.api_key,
            model: input.model,
            default_width: input.default_width,
            default_height: input.default_height,
        },
    )
    .await?;
    // creation defaults to active; an explicit false is applied right away
    let created = if input.is_active == Some(false) {
        model_configs::update_model_config(
            &state.db,
            created.id,
            ModelConfigUpdate { is_active: Some(false), ..Default::default() },
        )
        .await?
    } else {
        created
    };
    Ok((StatusCode::CREATED, Json(ModelConfigResponse::from(created))))
}

pub async fn get_model_config(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ModelConfigResponse>, ApiError> {
    current_user.require_admin()?;
    let found = model_configs::get_model_config(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("model config not found: {id}")))?;
    Ok(Json(ModelConfigResponse::from(found)))
}

pub async fn update_model_config(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ModelConfigInput>,
) -> Result<Json<ModelConfigResponse>, ApiError> {
    current_user.require_admin()?;
    let updated = model_configs::update_model_config(
        &state.db,
        id,
        ModelConfigUpdate {
            name: Some(input.name),
            api_base_url: Some(input.api_base_url),
            api_key: if input.api_key.is_empty() { None } else { Some(input.api_key) },
            model: Some(input.model),
            default_width: Some(input.default_width),
            default_height: Some(input.default_height),
            is_active: input.is_active,
        },
    )
    .await?;
    Ok(Json(ModelConfigResponse::from(updated)))
}

pub async fn delete_model_config(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    current_user.require_admin()?;
    model_configs::delete_model_config(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::warn;

use crate::errors::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

/// Serve a stored image. The store resolves the filename traversal-safely;
/// ServeFile supplies content-type and range handling.
pub async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = state
        .images
        .path_for(&filename)
        .ok_or_else(|| ApiError::not_found(format!("image not found: {filename}")))?;

    let req = Request::builder()
        .uri("/")
        .body(Body::empty())
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let resp = ServeFile::new(path)
        .oneshot(req)
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(resp.into_response())
}

/// Admin-only removal of a stored image file.
pub async fn delete_image(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(filename): Path<String>,
) -> Result<StatusCode, ApiError> {
    current_user.require_admin()?;
    let deleted = state.images.delete(&filename).await?;
    if !deleted {
        warn!(%filename, "delete of missing image");
        return Err(ApiError::not_found(format!("image not found: {filename}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

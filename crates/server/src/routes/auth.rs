use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use models::user;
use service::api_keys;
use service::auth::domain::{LoginInput, RegisterInput};
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::service::{AuthConfig, AuthService};

use crate::errors::ApiError;
use crate::extract::CurrentUser;
use crate::schemas::{ApiKeyCreated, ApiKeyRequest, MeOutput, RegisterOutput};
use crate::state::AppState;

const AUTH_COOKIE: &str = "auth_token";

fn auth_service(state: &AppState) -> AuthService<SeaOrmAuthRepository> {
    let repo = Arc::new(SeaOrmAuthRepository { db: state.db.clone() });
    AuthService::new(
        repo,
        AuthConfig {
            jwt_secret: state.auth.jwt_secret.clone(),
            token_ttl_hours: state.auth.token_ttl_hours,
            password_algorithm: "argon2".into(),
        },
    )
}

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<RegisterOutput>), ApiError> {
    // Validate using models helpers before the service runs
    user::validate_email(&input.email).map_err(|e| ApiError::bad_request(e.to_string()))?;
    user::validate_name(&input.name).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let created = auth_service(&state).register(input).await?;
    Ok((StatusCode::CREATED, Json(RegisterOutput { user_id: created.id })))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Json<MeOutput>), ApiError> {
    let session = auth_service(&state).login(input).await?;
    let user = session.user;
    let token = session
        .token
        .ok_or_else(|| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "token generation failed"))?;

    let mut cookie = Cookie::new(AUTH_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    let jar = jar.add(cookie);

    Ok((jar, Json(MeOutput { user_id: user.id, email: user.email, name: user.name })))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::from(AUTH_COOKIE));
    (jar, StatusCode::NO_CONTENT)
}

pub async fn me(current_user: CurrentUser) -> Result<Json<MeOutput>, ApiError> {
    match current_user {
        CurrentUser::Authenticated { user_id, email, name, .. } => {
            Ok(Json(MeOutput { user_id, email, name }))
        }
        CurrentUser::Anonymous => Err(ApiError::unauthorized("no auth")),
    }
}

/// Issue an API key for the authenticated caller. The plaintext is returned
/// exactly once; only its digest is stored.
pub async fn create_api_key(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ApiKeyRequest>,
) -> Result<(StatusCode, Json<ApiKeyCreated>), ApiError> {
    let user_id = current_user
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("authentication required"))?;
    let issued = api_keys::issue(&state.db, user_id, &input.label).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiKeyCreated {
            id: issued.record.id,
            key: issued.plaintext,
            label: issued.record.label,
        }),
    ))
}

//! Dependency layer: authenticated identity and client address extraction.

use std::net::SocketAddr;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use axum_extra::extract::cookie::CookieJar;
use sea_orm::EntityTrait;
use tracing::debug;
use uuid::Uuid;

use service::api_keys;
use service::auth::service::decode_token;

use crate::errors::ApiError;
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";
const AUTH_COOKIE: &str = "auth_token";

/// The caller's identity, resolved from `X-Api-Key`, a bearer token, or the
/// login cookie. No credentials at all means anonymous; credentials that fail
/// to verify are a 401, never a silent downgrade.
#[derive(Clone, Debug)]
pub enum CurrentUser {
    Anonymous,
    Authenticated { user_id: Uuid, email: String, name: String, is_admin: bool },
}

impl CurrentUser {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, CurrentUser::Authenticated { .. })
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, CurrentUser::Authenticated { is_admin: true, .. })
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            CurrentUser::Anonymous => None,
            CurrentUser::Authenticated { user_id, .. } => Some(*user_id),
        }
    }

    /// 403 unless the caller is an admin.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("admin access required"))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // API key takes precedence over tokens, matching the issue path
        if let Some(key) = header_value(&parts.headers, API_KEY_HEADER) {
            let record = api_keys::authenticate(&state.db, &key)
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| ApiError::unauthorized("invalid api key"))?;
            let user = load_user(state, record.user_id).await?;
            debug!(user_id = %record.user_id, "authenticated via api key");
            return Ok(user);
        }

        let bearer = header_value(&parts.headers, header::AUTHORIZATION.as_str())
            .and_then(|v| v.strip_prefix("Bearer ").map(str::to_string));
        let cookie_token = CookieJar::from_headers(&parts.headers)
            .get(AUTH_COOKIE)
            .map(|c| c.value().to_string());

        if let Some(token) = bearer.or(cookie_token) {
            let Some(secret) = &state.auth.jwt_secret else {
                return Err(ApiError::unauthorized("token auth is not enabled"));
            };
            let claims = decode_token(secret, &token)
                .map_err(|_| ApiError::unauthorized("invalid or expired token"))?;
            let user_id = Uuid::parse_str(&claims.uid)
                .map_err(|_| ApiError::unauthorized("invalid token subject"))?;
            let user = load_user(state, user_id).await?;
            debug!(%user_id, "authenticated via token");
            return Ok(user);
        }

        debug!("anonymous request");
        Ok(CurrentUser::Anonymous)
    }
}

async fn load_user(state: &AppState, user_id: Uuid) -> Result<CurrentUser, ApiError> {
    let user = models::user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(|e| ApiError::new(axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| ApiError::unauthorized("unknown user"))?;
    if user.status != "active" || user.deleted_at.is_some() {
        return Err(ApiError::unauthorized("user is not active"));
    }
    let is_admin = state.auth.is_admin(&user.email);
    Ok(CurrentUser::Authenticated { user_id: user.id, email: user.email, name: user.name, is_admin })
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// First `X-Forwarded-For` entry when present, else the socket peer.
pub fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    addr.ip().to_string()
}

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use service::generator::GeneratorClient;
use service::images::ImageStore;
use service::rate_limit::RateLimiter;
use service::worker::WorkerContext;

/// Auth-related settings shared with extractors and handlers.
#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
    pub admin_emails: Arc<Vec<String>>,
}

impl AuthSettings {
    pub fn from_config(cfg: &configs::AuthConfig) -> Self {
        let jwt_secret = if cfg.jwt_secret.trim().is_empty() {
            None
        } else {
            Some(cfg.jwt_secret.clone())
        };
        Self {
            jwt_secret,
            token_ttl_hours: cfg.token_ttl_hours,
            admin_emails: Arc::new(cfg.admin_emails.clone()),
        }
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|a| a.eq_ignore_ascii_case(email))
    }
}

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub generator: Arc<GeneratorClient>,
    pub images: Arc<ImageStore>,
    pub limiter: Arc<RateLimiter>,
    pub auth: AuthSettings,
}

impl AppState {
    pub fn worker_context(&self) -> WorkerContext {
        WorkerContext {
            db: self.db.clone(),
            generator: Arc::clone(&self.generator),
            images: Arc::clone(&self.images),
        }
    }
}

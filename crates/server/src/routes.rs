use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use axum::extract::State;

use crate::state::AppState;

pub mod auth;
pub mod generate;
pub mod images;
pub mod model_configs;
pub mod status;
pub mod tasks;

/// Liveness plus a database ping.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = state.db.ping().await.is_ok();
    Json(serde_json::json!({
        "timestamp": Utc::now().to_rfc3339(),
        "status": if database { "ok" } else { "degraded" },
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build the full application router: public health plus the versioned API.
pub fn build_router(cors: CorsLayer, state: AppState) -> Router {
    let api = Router::new()
        .route("/generate", post(generate::generate_image))
        .route("/generate/batch", post(generate::generate_batch))
        .route("/tasks", get(tasks::list_tasks))
        .route("/tasks/:id", get(tasks::get_task).delete(tasks::delete_task))
        .route(
            "/images/:filename",
            get(images::get_image).delete(images::delete_image),
        )
        .route("/status", get(status::get_status))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/api-keys", post(auth::create_api_key))
        .route(
            "/models",
            get(model_configs::list_model_configs).post(model_configs::create_model_config),
        )
        .route(
            "/models/:id",
            get(model_configs::get_model_config)
                .put(model_configs::update_model_config)
                .delete(model_configs::delete_model_config),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径等，日志级别为 INFO
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 请求到达时打点
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // 响应返回时打点，包含状态码与耗时
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 失败（5xx 等）时以 ERROR 记录
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

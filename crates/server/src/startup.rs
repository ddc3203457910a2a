use std::{env, net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::info;

use service::generator::GeneratorClient;
use service::images::ImageStore;
use service::rate_limit::RateLimiter;
use service::runtime;

use crate::routes;
use crate::state::{AppState, AuthSettings};

/// Initialize logging via shared common utils
fn init_logging() {
    init_logging_default();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load host/port from configs or env vars, with sensible fallbacks
fn load_bind_addr(cfg: &configs::AppConfig) -> anyhow::Result<SocketAddr> {
    let host = env::var("SERVER_HOST").unwrap_or_else(|_| cfg.server.host.clone());
    let port = env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(cfg.server.port);
    Ok(format!("{}:{}", host, port).parse()?)
}

/// Build the shared state from configuration: DB pool (migrated), generator
/// client, image store, rate limiter.
pub async fn build_state(cfg: &configs::AppConfig) -> anyhow::Result<AppState> {
    runtime::ensure_env(&cfg.storage.image_dir).await?;

    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await?;

    let generator = Arc::new(GeneratorClient::from_config(&cfg.generator)?);
    let images = Arc::new(ImageStore::new(&cfg.storage).await?);
    let limiter = Arc::new(RateLimiter::new(cfg.auth.rate_limit_per_minute));

    Ok(AppState {
        db,
        generator,
        images,
        limiter,
        auth: AuthSettings::from_config(&cfg.auth),
    })
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let cfg = configs::AppConfig::load_and_validate()?;
    let state = build_state(&cfg).await?;

    // Build router
    let cors = build_cors();
    let app: Router = routes::build_router(cors, state);

    // Bind and serve
    let addr = load_bind_addr(&cfg)?;
    info!(%addr, "starting server crate");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
    })
    .await?;
    Ok(())
}

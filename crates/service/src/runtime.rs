//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` to keep binary crates importing
//! `service::runtime::ensure_env` without depending directly on `common`.

/// Ensure the image storage directory exists.
pub async fn ensure_env(image_dir: &str) -> anyhow::Result<()> {
    common::env::ensure_env(image_dir).await
}

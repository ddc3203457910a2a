//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

/// Ensure the image storage directory exists, creating it if necessary.
pub async fn ensure_env(image_dir: &str) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(image_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {image_dir}: {e}"))?;
    Ok(())
}

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use common::token::unique_filename;
use configs::StorageConfig;

use crate::errors::ServiceError;

/// Local image storage rooted at a single directory. Filenames are generated
/// server-side; lookups never follow separators or `..` out of the root.
pub struct ImageStore {
    root: PathBuf,
    max_bytes: u64,
    allowed_types: Vec<String>,
    public_base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
pub struct StorageInfo {
    pub exists: bool,
    pub storage_path: String,
    pub total_files: u64,
    pub total_size_mb: f64,
}

impl ImageStore {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&cfg.image_dir).await?;
        info!(dir = %cfg.image_dir, "image store ready");
        Ok(Self {
            root: PathBuf::from(&cfg.image_dir),
            max_bytes: cfg.max_image_size_mb * 1024 * 1024,
            allowed_types: cfg.allowed_image_types.iter().map(|t| t.to_ascii_lowercase()).collect(),
            public_base_url: cfg.public_base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Save raw bytes under a collision-free name derived from the original.
    pub async fn save_bytes(&self, bytes: &[u8], original_name: &str) -> Result<String, ServiceError> {
        self.save_bytes_as(bytes, &unique_filename(original_name)).await
    }

    /// Save raw bytes under an exact (caller-controlled, still validated)
    /// filename. Used by the mock pipeline for deterministic names.
    pub async fn save_bytes_as(&self, bytes: &[u8], filename: &str) -> Result<String, ServiceError> {
        if bytes.len() as u64 > self.max_bytes {
            return Err(ServiceError::Validation(format!(
                "image too large, max {} bytes",
                self.max_bytes
            )));
        }
        if !Self::is_safe_name(filename) {
            return Err(ServiceError::Validation(format!("unsafe image filename: {filename}")));
        }
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !self.allowed_types.iter().any(|t| t == &ext) {
            return Err(ServiceError::Validation(format!("image type not allowed: {ext}")));
        }
        let path = self.root.join(filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        info!(file = %filename, size = bytes.len(), "image saved");
        Ok(filename.to_string())
    }

    /// Download an image and persist it locally.
    pub async fn save_from_url(&self, image_url: &str) -> Result<String, ServiceError> {
        if !image_url.starts_with("http://") && !image_url.starts_with("https://") {
            return Err(ServiceError::Validation(format!("invalid image url: {image_url}")));
        }
        let resp = self
            .http
            .get(image_url)
            .send()
            .await
            .map_err(|e| ServiceError::Upstream(e.to_string()))?
            .error_for_status()
            .map_err(|e| ServiceError::Upstream(e.to_string()))?;

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !["image/jpeg", "image/png", "image/webp"].iter().any(|t| content_type.contains(t)) {
            warn!(%content_type, "downloaded content is not an image type");
        }

        let original = image_url.rsplit('/').next().unwrap_or("image.jpg");
        let bytes = resp.bytes().await.map_err(|e| ServiceError::Upstream(e.to_string()))?;
        self.save_bytes(&bytes, original).await
    }

    /// Resolve a client-supplied filename to an existing file inside the root.
    pub fn path_for(&self, filename: &str) -> Option<PathBuf> {
        if !Self::is_safe_name(filename) {
            warn!(%filename, "rejected unsafe image filename");
            return None;
        }
        let path = self.root.join(filename);
        match path.metadata() {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    fn is_safe_name(filename: &str) -> bool {
        if filename.is_empty() {
            return false;
        }
        let p = Path::new(filename);
        let mut components = p.components();
        matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
    }

    /// URL clients use to fetch a stored image.
    pub fn public_url(&self, filename: &str) -> String {
        format!("{}/{}", self.public_base_url, filename)
    }

    /// Remove a stored image; false when it does not exist.
    pub async fn delete(&self, filename: &str) -> Result<bool, ServiceError> {
        let Some(path) = self.path_for(filename) else {
            return Ok(false);
        };
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        info!(file = %filename, "image deleted");
        Ok(true)
    }

    pub async fn storage_info(&self) -> Result<StorageInfo, ServiceError> {
        if tokio::fs::metadata(&self.root).await.is_err() {
            return Ok(StorageInfo {
                exists: false,
                storage_path: self.root.display().to_string(),
                total_files: 0,
                total_size_mb: 0.0,
            });
        }
        let mut total_files = 0u64;
        let mut total_size = 0u64;
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| ServiceError::Storage(e.to_string()))? {
            let meta = entry.metadata().await.map_err(|e| ServiceError::Storage(e.to_string()))?;
            if meta.is_file() {
                total_files += 1;
                total_size += meta.len();
            }
        }
        Ok(StorageInfo {
            exists: true,
            storage_path: self.root.display().to_string(),
            total_files,
            total_size_mb: (total_size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, ImageStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = StorageConfig {
            image_dir: dir.path().to_string_lossy().into_owned(),
            max_image_size_mb: 1,
            allowed_image_types: vec!["jpg".into(), "png".into()],
            public_base_url: "/api/v1/images".into(),
        };
        let store = ImageStore::new(&cfg).await.expect("store");
        (dir, store)
    }

    #[tokio::test]
    async fn save_and_fetch_round_trip() {
        let (_dir, store) = store().await;
        let name = store.save_bytes(b"jpeg-bytes", "photo.jpg").await.expect("save");
        assert!(name.ends_with(".jpg"));
        let path = store.path_for(&name).expect("path");
        assert_eq!(std::fs::read(path).expect("read"), b"jpeg-bytes");
        assert_eq!(store.public_url(&name), format!("/api/v1/images/{name}"));
    }

    #[tokio::test]
    async fn size_cap_and_type_allowlist() {
        let (_dir, store) = store().await;
        let big = vec![0u8; 1024 * 1024 + 1];
        assert!(matches!(
            store.save_bytes(&big, "big.jpg").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            store.save_bytes(b"x", "anim.gif").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let (_dir, store) = store().await;
        assert!(store.path_for("../etc/passwd").is_none());
        assert!(store.path_for("a/b.jpg").is_none());
        assert!(store.path_for("..").is_none());
        assert!(store.path_for("").is_none());
    }

    #[tokio::test]
    async fn delete_and_storage_info() {
        let (_dir, store) = store().await;
        let name = store.save_bytes(b"data", "a.png").await.expect("save");
        let info = store.storage_info().await.expect("info");
        assert!(info.exists);
        assert_eq!(info.total_files, 1);

        assert!(store.delete(&name).await.expect("delete"));
        assert!(!store.delete(&name).await.expect("second delete"));
        let info = store.storage_info().await.expect("info");
        assert_eq!(info.total_files, 0);
    }
}

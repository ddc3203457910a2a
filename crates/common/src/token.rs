//! Random tokens and collision-free filenames.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generate a random alphanumeric token of the given length.
pub fn generate_token(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Derive a collision-free filename from an original name:
/// `{yyyymmdd_hhmmss}_{8-char token}.{ext}`. Falls back to `.jpg` when the
/// original carries no extension.
pub fn unique_filename(original: &str) -> String {
    let ext = std::path::Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg")
        .to_ascii_lowercase();
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.{}", stamp, generate_token(8), ext)
}

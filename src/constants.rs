//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! To change the default artifact location or lookup budget, only edit
//! this file.

use std::path::PathBuf;
use std::time::Duration;

/// Default RDAP endpoint for domain lookups
pub const DEFAULT_RDAP_URL: &str = "https://rdap.org";

/// Default auxiliary lookup timeout (milliseconds)
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 1500;

/// Default artifact file name
pub const DEFAULT_ARTIFACT_NAME: &str = "url-shield-model.json";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "URL-Shield";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get the artifact directory from environment or use the platform default
pub fn get_artifact_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("URL_SHIELD_ARTIFACT_DIR") {
        return PathBuf::from(dir);
    }

    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("url-shield")
        .join("models")
}

/// Get the default artifact path (directory + file name)
pub fn get_default_artifact_path() -> PathBuf {
    get_artifact_dir().join(DEFAULT_ARTIFACT_NAME)
}

/// Get the auxiliary lookup timeout from environment or use default
pub fn get_lookup_timeout() -> Duration {
    let ms = std::env::var("URL_SHIELD_LOOKUP_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_LOOKUP_TIMEOUT_MS);
    Duration::from_millis(ms)
}

/// Get the RDAP base URL from environment or use default
pub fn get_rdap_url() -> String {
    std::env::var("URL_SHIELD_RDAP_URL").unwrap_or_else(|_| DEFAULT_RDAP_URL.to_string())
}

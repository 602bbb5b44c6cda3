//! Gateway configuration types.
//!
//! This module defines configuration structures for the HTTP gateway.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Directory holding the RocksDB database.
    #[serde(default = "GatewayConfig::default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory where contract files are written.
    #[serde(default = "GatewayConfig::default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes. Bounds contract uploads.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Audit entries returned when the caller gives no limit.
    #[serde(default = "GatewayConfig::default_audit_limit")]
    pub audit_page_size: usize,

    /// Create the demo accounts at startup when no admin exists.
    #[serde(default)]
    pub seed_demo_users: bool,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    fn default_data_dir() -> PathBuf {
        PathBuf::from("data/yarnflow")
    }

    fn default_upload_dir() -> PathBuf {
        PathBuf::from("uploads")
    }

    const fn default_max_body() -> usize {
        16 * 1024 * 1024 + 64 * 1024 // contract limit plus multipart framing
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    const fn default_audit_limit() -> usize {
        100
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            data_dir: Self::default_data_dir(),
            upload_dir: Self::default_upload_dir(),
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            audit_page_size: Self::default_audit_limit(),
            seed_demo_users: false,
        }
    }
}

//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use repairdesk_shared::constants::{DEFAULT_API_KEY, DEFAULT_HTTP_PORT, DEFAULT_MAX_UPLOAD_SIZE};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`, or `PORT` to change only the port.
    /// Default: `0.0.0.0:5000`
    pub http_addr: SocketAddr,

    /// Shared secret for `POST /submit-with-apikey`.
    /// Env: `API_KEY`
    /// Default: `TEST_API_KEY_123` (development only).
    pub api_key: String,

    /// JSON file holding every accepted submission.
    /// Env: `SUBMISSIONS_FILE`
    /// Default: `{DATA_DIR}/submissions.json`
    pub submissions_file: PathBuf,

    /// Directory where uploaded images are stored.
    /// Env: `UPLOADS_DIR`
    /// Default: `{DATA_DIR}/uploads`
    pub uploads_dir: PathBuf,

    /// Maximum accepted size of one uploaded image, in bytes.
    /// Env: `MAX_UPLOAD_SIZE`
    /// Default: 10 MiB
    pub max_upload_size: usize,
}

// api_key stays out of logs
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("api_key", &"<redacted>")
            .field("submissions_file", &self.submissions_file)
            .field("uploads_dir", &self.uploads_dir)
            .field("max_upload_size", &self.max_upload_size)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_data_dir(PathBuf::from("./data"))
    }
}

impl ServerConfig {
    /// Defaults with both storage locations placed under `data_dir`.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            api_key: DEFAULT_API_KEY.to_string(),
            submissions_file: data_dir.join("submissions.json"),
            uploads_dir: data_dir.join("uploads"),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match var("DATA_DIR") {
            Some(dir) if !dir.is_empty() => Self::with_data_dir(PathBuf::from(dir)),
            _ => Self::default(),
        };

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(port) = var("PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                config.http_addr.set_port(parsed);
            } else {
                tracing::warn!(value = %port, "Invalid PORT, using default");
            }
        }

        if let Some(key) = var("API_KEY") {
            if !key.is_empty() {
                config.api_key = key;
            }
        }

        if let Some(path) = var("SUBMISSIONS_FILE") {
            config.submissions_file = PathBuf::from(path);
        }

        if let Some(path) = var("UPLOADS_DIR") {
            config.uploads_dir = PathBuf::from(path);
        }

        if let Some(val) = var("MAX_UPLOAD_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_upload_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_UPLOAD_SIZE, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    pub fn uses_default_api_key(&self) -> bool {
        self.api_key == DEFAULT_API_KEY
    }
}

//! Configuration management for wattlog.
//!
//! Configuration comes from three layers, later layers winning:
//! built-in defaults, an optional TOML file, and environment variables for
//! the secrets that should not live on disk (trigger token, source API
//! token, spreadsheet id).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "wattlog.toml";

/// Environment variable holding the trigger endpoint secret.
pub const ENV_TRIGGER_TOKEN: &str = "WATTLOG_TRIGGER_TOKEN";
/// Environment variable holding the source spreadsheet id.
pub const ENV_SPREADSHEET_ID: &str = "WATTLOG_SPREADSHEET_ID";
/// Environment variable holding the source API bearer token.
pub const ENV_SOURCE_TOKEN: &str = "WATTLOG_SOURCE_TOKEN";
/// Environment variable overriding the store path.
pub const ENV_STORE_PATH: &str = "WATTLOG_STORE_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub sync: SyncConfig,
}

/// HTTP trigger endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Secret compared against the trigger request's bearer token. When
    /// unset, every trigger request is rejected.
    pub trigger_token: Option<String>,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            trigger_token: None,
            enable_cors: true,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// External tabular source (spreadsheet values API) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the values API; overridable so tests can point at a stub.
    pub base_url: String,
    pub spreadsheet_id: String,
    /// Bearer token for the values API.
    pub api_token: Option<String>,
    /// How many of the newest data rows to pull per table per tick.
    pub fetch_limit: usize,
    /// Per-request timeout for source calls, in seconds.
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sheets.googleapis.com".to_string(),
            spreadsheet_id: String::new(),
            api_token: None,
            fetch_limit: 1000,
            timeout_secs: 30,
        }
    }
}

/// Persistent store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("wattlog.duckdb"),
        }
    }
}

/// Sync engine tunables.
///
/// The dedup windows are tolerances, not invariants: the right values
/// depend on the source's clock resolution, so they are configuration with
/// the field-proven defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Half-width of the access-event dedup window, in milliseconds.
    pub access_window_ms: i64,
    /// Half-width of the telemetry dedup window, in milliseconds.
    pub telemetry_window_ms: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            access_window_ms: 1_000,
            telemetry_window_ms: 2_000,
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist; without one, `wattlog.toml` in the
    /// working directory is used when present, defaults otherwise.
    /// Environment overrides are applied last in both cases.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    tracing::debug!("no config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a TOML config file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Overlay secrets and paths from the environment.
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(ENV_TRIGGER_TOKEN) {
            if !token.is_empty() {
                self.server.trigger_token = Some(token);
            }
        }
        if let Ok(id) = std::env::var(ENV_SPREADSHEET_ID) {
            if !id.is_empty() {
                self.source.spreadsheet_id = id;
            }
        }
        if let Ok(token) = std::env::var(ENV_SOURCE_TOKEN) {
            if !token.is_empty() {
                self.source.api_token = Some(token);
            }
        }
        if let Ok(path) = std::env::var(ENV_STORE_PATH) {
            if !path.is_empty() {
                self.store.path = PathBuf::from(path);
            }
        }
    }
}

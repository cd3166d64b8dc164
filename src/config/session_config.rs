//! Session configuration: server endpoint, credentials and sampling cadence.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults::{
    API_KEY_ENV, CONFIG_PATH_ENV, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_INTERVAL_MS,
    DEFAULT_RETRY_DELAY_MS, INTERVAL_MS_ENV, LOCAL_CONFIG_FILE, SERVER_URL_ENV,
};
use crate::types::TrackingConfig;

/// Everything a tracking session needs from its owner.
///
/// Build with [`SessionConfig::new`] (validating) and adjust the optional
/// fields with struct update syntax, or load from TOML with
/// [`SessionConfig::load`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Analytics server base URL, e.g. `https://analytics.example.com/`
    pub server_url: String,
    pub api_key: String,
    /// Initial sampling interval (ms)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: i64,
    /// Fixed delay between failed delivery attempts (ms)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Free-text device description attached to every sample
    #[serde(default = "default_device_info")]
    pub device_info: String,
    /// Subject the samples belong to; can also be set later on the session
    #[serde(default)]
    pub subject_id: Option<String>,
}

fn default_interval_ms() -> i64 {
    DEFAULT_INTERVAL_MS
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// `"<arch> / <os>"` of the running build, e.g. `"aarch64 / android"`.
pub fn default_device_info() -> String {
    format!("{} / {}", std::env::consts::ARCH, std::env::consts::OS)
}

impl SessionConfig {
    /// Create a config with defaults for everything but the endpoint.
    ///
    /// Rejects a blank server URL or API key here rather than at first use.
    pub fn new(server_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            server_url: server_url.into(),
            api_key: api_key.into(),
            interval_ms: DEFAULT_INTERVAL_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            device_info: default_device_info(),
            subject_id: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration using the standard search order:
    /// 1. `$LOCATION_ANALYTICS_CONFIG` environment variable
    /// 2. `./location_analytics.toml` in the current working directory
    /// 3. Environment only
    ///
    /// `LOCATION_ANALYTICS_SERVER_URL`, `LOCATION_ANALYTICS_API_KEY` and
    /// `LOCATION_ANALYTICS_INTERVAL_MS` override whatever the file says.
    pub fn load() -> Result<Self, ConfigError> {
        let file = Self::discover_file();

        let mut config = match &file {
            Some(path) => Self::parse_file(path)?,
            None => {
                info!("No config file found, reading endpoint from environment");
                Self::from_env_only()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;

        info!(
            server = %config.server_url,
            interval_ms = config.interval_ms,
            "Session config loaded"
        );
        Ok(config)
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Read session config file");
        Ok(config)
    }

    fn discover_file() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                return Some(p);
            }
            warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_PATH_ENV);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        local.exists().then_some(local)
    }

    fn from_env_only() -> Self {
        Self {
            server_url: String::new(),
            api_key: String::new(),
            interval_ms: DEFAULT_INTERVAL_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            device_info: default_device_info(),
            subject_id: None,
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            self.server_url = url;
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            self.api_key = key;
        }
        if let Ok(raw) = std::env::var(INTERVAL_MS_ENV) {
            self.interval_ms = raw.trim().parse().map_err(|_| {
                ConfigError::Validation(vec![format!("{INTERVAL_MS_ENV}: not an integer ({raw})")])
            })?;
        }
        Ok(())
    }

    /// Validate the config for use by a session.
    ///
    /// Rules:
    /// - server URL and API key must be non-blank
    /// - server URL must be http(s)
    /// - interval must be positive
    /// - HTTP timeout must be positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let url = self.server_url.trim();
        if url.is_empty() {
            errors.push("server_url: must be set".to_string());
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!("server_url: expected http(s) URL (got '{url}')"));
        }

        if self.api_key.trim().is_empty() {
            errors.push("api_key: must be set".to_string());
        }

        if self.interval_ms <= 0 {
            errors.push(format!("interval_ms: must be > 0 (got {})", self.interval_ms));
        }

        if self.http_timeout_secs == 0 {
            errors.push("http_timeout_secs: must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    pub fn tracking_config(&self) -> TrackingConfig {
        TrackingConfig::with_interval(self.interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Validation(Vec<String>),
    /// Rejected runtime reconfiguration
    InvalidInterval(i64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
            ConfigError::InvalidInterval(ms) => {
                write!(f, "Invalid tracking interval: {ms}ms (must be > 0)")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

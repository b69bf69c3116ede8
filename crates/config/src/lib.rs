//! cloudpush configuration.
//!
//! Stored as JSON:
//! - Linux: `~/.config/cloudpush/config.json`
//! - Windows: `%APPDATA%/cloudpush/config.json`
//!
//! Missing keys take their defaults. `CLOUDPUSH_*` environment variables
//! override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cloudpush_cc::{ClientConfig, PollingConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ENV_API: &str = "CLOUDPUSH_API";
pub const ENV_POLLING_INTERVAL: &str = "CLOUDPUSH_POLLING_INTERVAL";
pub const ENV_POLLING_TIMEOUT: &str = "CLOUDPUSH_POLLING_TIMEOUT";
pub const ENV_SKIP_SSL_VALIDATION: &str = "CLOUDPUSH_SKIP_SSL_VALIDATION";

/// Errors loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Persistent settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Cloud Controller base URL.
    #[serde(default)]
    pub api: String,

    #[serde(default)]
    pub skip_ssl_validation: bool,

    /// Seconds between job polls.
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,

    /// Overall seconds allowed for one job to finish.
    #[serde(default = "default_polling_timeout")]
    pub polling_timeout_secs: u64,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_dial_timeout")]
    pub dial_timeout_secs: u64,
}

fn default_polling_interval() -> u64 {
    5
}

fn default_polling_timeout() -> u64 {
    15 * 60
}

fn default_dial_timeout() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: String::new(),
            skip_ssl_validation: false,
            polling_interval_secs: default_polling_interval(),
            polling_timeout_secs: default_polling_timeout(),
            dial_timeout_secs: default_dial_timeout(),
        }
    }
}

impl Config {
    /// Loads the configuration file, creating it with defaults when
    /// absent, then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&config_path())?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Loads from `path` without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Applies `CLOUDPUSH_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api) = lookup(ENV_API).filter(|v| !v.is_empty()) {
            self.api = api;
        }
        if let Some(v) = lookup(ENV_POLLING_INTERVAL) {
            self.polling_interval_secs = parse_secs(ENV_POLLING_INTERVAL, &v)?;
        }
        if let Some(v) = lookup(ENV_POLLING_TIMEOUT) {
            self.polling_timeout_secs = parse_secs(ENV_POLLING_TIMEOUT, &v)?;
        }
        if let Some(v) = lookup(ENV_SKIP_SSL_VALIDATION) {
            self.skip_ssl_validation = parse_bool(ENV_SKIP_SSL_VALIDATION, &v)?;
        }
        Ok(())
    }

    /// Polling interval and timeout must both be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("polling_interval_secs", self.polling_interval_secs),
            ("polling_timeout_secs", self.polling_timeout_secs),
        ];
        for (key, secs) in checks {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: secs.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn polling(&self) -> PollingConfig {
        PollingConfig {
            interval: Duration::from_secs(self.polling_interval_secs),
            timeout: Duration::from_secs(self.polling_timeout_secs),
        }
    }

    /// Client settings for this configuration and the given token.
    pub fn client_config(&self, access_token: impl Into<String>) -> ClientConfig {
        ClientConfig {
            api_url: self.api.clone(),
            access_token: access_token.into(),
            skip_ssl_validation: self.skip_ssl_validation,
            dial_timeout: Duration::from_secs(self.dial_timeout_secs),
            polling: self.polling(),
        }
    }
}

fn parse_secs(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("cloudpush").join("config.json")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("cloudpush")
            .join("config.json")
    }
}

//! Client and polling configuration.

use std::time::Duration;

/// Default interval between job polls.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(5);

/// Default overall budget for polling a single job.
pub const DEFAULT_POLLING_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Default TCP connect timeout.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// How jobs are polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLLING_INTERVAL,
            timeout: DEFAULT_POLLING_TIMEOUT,
        }
    }
}

/// Everything needed to build a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Cloud Controller, e.g. `https://api.example.com`.
    pub api_url: String,
    /// OAuth access token, without the `bearer` prefix. Empty disables
    /// the `Authorization` header.
    pub access_token: String,
    pub skip_ssl_validation: bool,
    pub dial_timeout: Duration,
    pub polling: PollingConfig,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            access_token: access_token.into(),
            skip_ssl_validation: false,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            polling: PollingConfig::default(),
        }
    }
}

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults::{
    DEFAULT_GREETING_METHOD, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT,
};
use crate::error::ConfigError;

/// One layer of settings as written in a TOML file.
///
/// Every field is optional so layers can be merged; durations are whole
/// seconds. An empty `greeting_method` disables the greeting request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SettingsFile {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ssl: Option<bool>,
    pub api_key: Option<String>,
    pub timeout: Option<u64>,
    pub retry_delay: Option<u64>,
    pub retry: Option<bool>,
    pub greeting_method: Option<String>,
}

impl SettingsFile {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }
}

/// Resolved settings of a client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub host: String,
    pub port: u16,
    pub ssl: bool,
    /// Sent as the `X-Api-Key` handshake header when present
    pub api_key: Option<String>,
    /// Bound on opening the socket, on `connect()`, and on every call
    pub timeout: Duration,
    pub retry_delay: Duration,
    /// Reconnect after a lost connection instead of stopping
    pub retry: bool,
    pub greeting_method: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ssl: false,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            retry: true,
            greeting_method: Some(DEFAULT_GREETING_METHOD.to_string()),
        }
    }
}

impl TryFrom<SettingsFile> for ClientSettings {
    type Error = ConfigError;

    fn try_from(file: SettingsFile) -> Result<Self, Self::Error> {
        let defaults = ClientSettings::default();

        let host = file.host.unwrap_or(defaults.host);
        if host.trim().is_empty() {
            return Err(ConfigError::invalid("host must not be empty"));
        }

        let port = file.port.unwrap_or(defaults.port);
        if port == 0 {
            return Err(ConfigError::invalid("port must be between 1 and 65535"));
        }

        let timeout = file.timeout.map(Duration::from_secs).unwrap_or(defaults.timeout);
        if timeout.is_zero() {
            return Err(ConfigError::invalid("timeout must be at least one second"));
        }

        Ok(Self {
            host,
            port,
            ssl: file.ssl.unwrap_or(defaults.ssl),
            api_key: file.api_key.filter(|key| !key.is_empty()),
            timeout,
            retry_delay: file
                .retry_delay
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_delay),
            retry: file.retry.unwrap_or(defaults.retry),
            greeting_method: match file.greeting_method {
                Some(method) if method.is_empty() => None,
                Some(method) => Some(method),
                None => defaults.greeting_method,
            },
        })
    }
}

//! Client settings: TOML layers merged into [`ClientSettings`].
//!
//! Layers, lowest precedence first: programmed defaults, the user config
//! file, a project/explicit config file, then overrides (CLI flags).

pub mod defaults;
pub mod settings;
pub mod user;

use std::path::Path;

pub use settings::{ClientSettings, SettingsFile};
pub use user::{load_user_config, user_config_path};

use crate::error::ConfigError;

/// Merge multiple settings layers in order.
/// Later layers in the slice have higher precedence (override earlier ones).
pub fn merge_all(layers: &[Option<SettingsFile>]) -> Option<SettingsFile> {
    layers.iter().cloned().reduce(merge_settings).flatten()
}

/// Merge two settings layers, preferring values from `primary` over `fallback`
pub fn merge_settings(
    fallback: Option<SettingsFile>,
    primary: Option<SettingsFile>,
) -> Option<SettingsFile> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(settings), None) => Some(settings),
        (None, Some(settings)) => Some(settings),
        (Some(fallback), Some(primary)) => Some(SettingsFile {
            host: primary.host.or(fallback.host),
            port: primary.port.or(fallback.port),
            ssl: primary.ssl.or(fallback.ssl),
            api_key: primary.api_key.or(fallback.api_key),
            timeout: primary.timeout.or(fallback.timeout),
            retry_delay: primary.retry_delay.or(fallback.retry_delay),
            retry: primary.retry.or(fallback.retry),
            greeting_method: primary.greeting_method.or(fallback.greeting_method),
        }),
    }
}

/// Load the effective settings.
///
/// A broken user config is logged and skipped. A broken explicit config file
/// is an error, since the caller asked for it by name.
pub fn load_settings(
    config_file: Option<&Path>,
    overrides: Option<SettingsFile>,
) -> Result<ClientSettings, ConfigError> {
    let defaults = Some(defaults::default_settings());

    let user_config = match load_user_config() {
        Ok(loaded) => loaded,
        Err(err) => {
            log::warn!(
                target: "moonlink::config",
                "Failed to load user config: {}",
                err
            );
            None
        }
    };

    let explicit = match config_file {
        Some(path) => Some(SettingsFile::from_path(path)?),
        None => None,
    };

    let merged = merge_all(&[defaults, user_config, explicit, overrides]).unwrap_or_default();
    ClientSettings::try_from(merged)
}

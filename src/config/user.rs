//! User configuration loading for moonlink.
//!
//! User config location: $XDG_CONFIG_HOME/moonlink/moonlink.toml
//! Fallback: the platform config directory (via `dirs`), e.g.
//! ~/.config/moonlink/moonlink.toml on Linux

use std::path::{Path, PathBuf};

use super::settings::SettingsFile;
use crate::error::ConfigError;

const APP_DIR: &str = "moonlink";
const FILE_NAME: &str = "moonlink.toml";

/// Returns the path to the user configuration file.
///
/// The path is determined by:
/// 1. If $XDG_CONFIG_HOME is set: $XDG_CONFIG_HOME/moonlink/moonlink.toml
/// 2. Otherwise: <platform config dir>/moonlink/moonlink.toml
///
/// Returns None if neither location can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    config_path_in(std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from), dirs::config_dir())
}

fn config_path_in(xdg_config: Option<PathBuf>, platform: Option<PathBuf>) -> Option<PathBuf> {
    xdg_config
        .filter(|dir| !dir.as_os_str().is_empty())
        .or(platform)
        .map(|dir| dir.join(APP_DIR).join(FILE_NAME))
}

/// Load the user configuration file.
///
/// Returns `Ok(None)` when no user config exists (zero-config experience).
pub fn load_user_config() -> Result<Option<SettingsFile>, ConfigError> {
    match user_config_path() {
        Some(path) => load_optional(&path),
        None => Ok(None),
    }
}

pub(crate) fn load_optional(path: &Path) -> Result<Option<SettingsFile>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    SettingsFile::from_path(path).map(Some)
}

//! Default configuration values for moonlink.
//!
//! These form the lowest-precedence layer of the settings merge.

use std::time::Duration;

use super::settings::SettingsFile;

pub const DEFAULT_HOST: &str = "localhost";

/// Port the printer API listens on out of the box.
pub const DEFAULT_PORT: u16 = 7125;

/// Bound on opening the socket and on every call awaiting its reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Pause between a lost connection and the next attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Sent after every handshake; its reply lists the printer objects the
/// server supports.
pub const DEFAULT_GREETING_METHOD: &str = "printer.objects.list";

/// Returns the default settings layer with every field populated.
pub fn default_settings() -> SettingsFile {
    SettingsFile {
        host: Some(DEFAULT_HOST.to_string()),
        port: Some(DEFAULT_PORT),
        ssl: Some(false),
        api_key: None,
        timeout: Some(DEFAULT_TIMEOUT.as_secs()),
        retry_delay: Some(DEFAULT_RETRY_DELAY.as_secs()),
        retry: Some(true),
        greeting_method: Some(DEFAULT_GREETING_METHOD.to_string()),
    }
}

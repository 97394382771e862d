//! Shared test helpers for integration tests.
//!
//! Note: We use `helpers/mod.rs` instead of the modern `helpers.rs` + `helpers/` pattern
//! because Cargo auto-discovers top-level `.rs` files in `tests/` as integration tests.
//! A `tests/helpers.rs` file would be compiled as a standalone test, which we don't want.

#![allow(dead_code)]

pub mod fake_server;
pub mod polling;
pub mod recording;

use std::time::Duration;

use moonlink::ClientSettings;

/// Settings pointing at a local fake server, with short bounds so failures
/// surface quickly.
pub fn local_settings(port: u16) -> ClientSettings {
    ClientSettings {
        host: "127.0.0.1".to_string(),
        port,
        timeout: Duration::from_secs(2),
        retry_delay: Duration::from_millis(100),
        retry: false,
        ..ClientSettings::default()
    }
}

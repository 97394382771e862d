//! Error handling types for moonlink
//!
//! This module provides the error types surfaced to API consumers and the
//! configuration loader.

use std::sync::PoisonError;
use thiserror::Error;

/// Errors surfaced by the websocket client.
///
/// Every variant is `Clone` so a single failure (e.g. a dropped socket) can be
/// fanned out to every call that was pending at the time.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// `connect()` was called while a supervisor task is still active
    #[error("client is already connected")]
    AlreadyConnected,

    /// A request was issued while the connection is not in the Connected state
    #[error("client is not connected")]
    NotConnected,

    /// The server rejected the websocket handshake (HTTP 401)
    #[error("server rejected the connection: unauthenticated")]
    Unauthenticated,

    /// A call (or the initial connection) did not complete before its deadline
    #[error("request timed out")]
    Timeout,

    /// The call was aborted because its connection was torn down
    #[error("request cancelled")]
    Cancelled,

    /// Socket-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a JSON-RPC error object
    #[error("remote error: {0}")]
    Remote(serde_json::Value),

    /// A request or reply could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// No tokio runtime was available to schedule the client's tasks
    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        ClientError::Transport(message.into())
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        ClientError::Serialization(message.into())
    }

    /// Whether the supervisor should give up instead of retrying after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::Unauthenticated)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

/// Errors raised while loading client settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error while reading a settings file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid TOML for `ClientSettings`
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not acceptable
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            message: message.into(),
        }
    }
}

/// Helper trait to recover a guard from a poisoned lock.
///
/// Client state is plain data with no invariants spanning a panic, so the
/// inner value is always safe to keep using.
pub trait LockResultExt<T> {
    /// Recover the guard, logging which operation hit the poisoned lock.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "moonlink::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}

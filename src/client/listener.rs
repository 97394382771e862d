//! Listener boundary for connection events.

use async_trait::async_trait;
use serde_json::Value;

use super::state::ConnectionState;
use crate::error::ClientError;

/// Receiver of connection events.
///
/// Events are delivered one at a time, in the order the client produced
/// them, from a dedicated dispatcher task. A slow listener therefore delays
/// later events but never the receive loop. Every method defaults to a no-op.
#[async_trait]
pub trait ClientListener: Send + Sync {
    /// The connection entered a new lifecycle state.
    async fn state_changed(&self, _state: ConnectionState) {}

    /// The server pushed a notification.
    async fn on_notification(&self, _method: &str, _params: Value) {}

    /// A connection-level failure occurred (handshake or socket error).
    async fn on_exception(&self, _error: ClientError) {}
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl ClientListener for NoopListener {}

//! Connection lifecycle states.

/// State of the websocket connection.
///
/// State transitions:
/// - Stopped -> Connecting (connect)
/// - Connecting -> Connected (handshake complete)
/// - Connecting -> Stopping (handshake rejected as unauthenticated, no retry)
/// - Connected -> Stopping (disconnect requested)
/// - Connected/Connecting -> Disconnected (transport failure, retry enabled)
/// - Disconnected -> Connecting (after the retry delay)
/// - Stopping -> Stopped (supervisor exited, terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No supervisor running (initial and terminal state)
    Stopped,
    /// Opening the socket and performing the websocket handshake
    Connecting,
    /// Handshake complete, requests are accepted
    Connected,
    /// Stop requested, tearing down
    Stopping,
    /// Connection lost, waiting out the retry delay
    Disconnected,
}

impl ConnectionState {
    /// Whether requests can be issued in this state.
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }

    /// Stable lowercase name, used in logs and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Stopped => "stopped",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Stopping => "stopping",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

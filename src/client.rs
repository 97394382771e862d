//! Persistent JSON-RPC client over a websocket.
//!
//! # Components
//!
//! - `Client`: Public handle; connect, disconnect, issue calls
//! - `Supervisor`: Connection lifecycle state machine with retry
//! - `PendingCalls`: Correlates replies with waiting callers by request id
//! - `ScopedRequest`: Caller's view of one call, cleaned up on drop
//! - Actor loops: single reader and single writer per connection epoch
//! - Dispatcher: ordered delivery of events to the `ClientListener`

mod actor;
mod api;
mod call;
mod connection;
mod dispatcher;
mod handler;
mod listener;
mod pending;
mod scoped;
mod state;
mod supervisor;
mod tasks;
mod transport;

pub use api::{Client, ClientBuilder};
pub use call::{CallHandle, CallOutcome};
pub use handler::MessageHandler;
pub use listener::{ClientListener, NoopListener};
pub use scoped::ScopedRequest;
pub use state::ConnectionState;
pub use transport::{
    API_KEY_HEADER, FrameSink, FrameStream, Session, Transport, TungsteniteTransport,
    websocket_url,
};

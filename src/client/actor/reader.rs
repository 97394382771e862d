//! Receive loop for the websocket stream.
//!
//! Consumes inbound frames until the server closes the socket or the stream
//! fails:
//! - Replies are routed through the pending-call table to their waiters
//! - Uncorrelated messages are offered to the message handlers
//! - Notifications are queued for the listener without blocking the loop
//! - Frames that do not decode are logged and skipped

use futures::{Stream, StreamExt};
use log::{debug, trace, warn};
use serde_json::Value;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::client::dispatcher::EventSender;
use crate::client::handler::HandlerChain;
use crate::client::pending::PendingCalls;
use crate::error::{ClientError, ClientResult};
use crate::protocol::{self, Inbound};

/// Everything the receive loop routes inbound messages to.
pub(crate) struct Inbox<'a> {
    pub(crate) pending: &'a PendingCalls,
    pub(crate) handlers: &'a HandlerChain,
    pub(crate) events: &'a EventSender,
}

/// Read frames until the socket closes.
///
/// Returns `Ok(())` on a close frame or end of stream, and the transport
/// error otherwise.
pub(crate) async fn recv_loop<S>(stream: &mut S, inbox: Inbox<'_>) -> ClientResult<()>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_text(text.as_str(), &inbox),
            Ok(Message::Close(frame)) => {
                debug!(
                    target: "moonlink::reader",
                    "Server closed the websocket: {:?}",
                    frame
                );
                return Ok(());
            }
            Ok(Message::Binary(data)) => {
                debug!(
                    target: "moonlink::reader",
                    "Ignoring {} byte binary frame",
                    data.len()
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(
                    target: "moonlink::reader",
                    "Websocket read error: {}",
                    e
                );
                return Err(ClientError::transport(e.to_string()));
            }
        }
    }

    debug!(target: "moonlink::reader", "Websocket stream ended");
    Ok(())
}

/// Handle a single text frame from the server.
pub(crate) fn handle_text(text: &str, inbox: &Inbox<'_>) {
    match protocol::decode(text) {
        Ok(message) => handle_message(message, inbox),
        Err(e) => {
            warn!(
                target: "moonlink::reader",
                "Dropping undecodable frame: {}",
                e
            );
        }
    }
}

fn handle_message(message: Value, inbox: &Inbox<'_>) {
    match protocol::classify(&message) {
        Inbound::Reply { id, reply } => {
            if inbox.pending.resolve(id, reply) {
                return;
            }
            if !inbox.handlers.dispatch(&message) {
                debug!(
                    target: "moonlink::reader",
                    "Reply for unknown request ID {}, dropping",
                    id
                );
            }
        }
        Inbound::Notification { method, params } => {
            let consumed = inbox.handlers.dispatch(&message);
            trace!(
                target: "moonlink::reader",
                "Received notification: {} (consumed by handler: {})",
                method,
                consumed
            );
            inbox.events.notification(method, params);
        }
        Inbound::Other => {
            if !inbox.handlers.dispatch(&message) {
                debug!(
                    target: "moonlink::reader",
                    "Unrecognised message shape, dropping"
                );
            }
        }
    }
}

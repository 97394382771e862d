//! Send loop for the websocket sink.
//!
//! The single writer of a connection epoch: takes queued requests in arrival
//! order and writes each as a text frame, suspending while the queue is
//! empty. Shutdown is driven from outside, either by the supervisor dropping
//! this future when it tears the epoch down or by the queue closing.

use futures::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};

use super::OutboundMessage;
use crate::client::pending::PendingCalls;
use crate::error::{ClientError, ClientResult};

/// Write queued messages until the queue closes or a write fails.
///
/// A failed write settles the request it carried with the transport error
/// and ends the loop with that error.
pub(crate) async fn send_loop<S>(
    sink: &mut S,
    rx: &mut mpsc::UnboundedReceiver<OutboundMessage>,
    pending: &PendingCalls,
) -> ClientResult<()>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    while let Some(message) = rx.recv().await {
        let request_id = message.request_id();
        if let Err(e) = sink.send(Message::text(message.into_payload())).await {
            log::warn!(
                target: "moonlink::writer",
                "Write error: {}",
                e
            );
            let error = ClientError::transport(e.to_string());
            if let Some(request_id) = request_id {
                pending.fail(request_id, error.clone());
            }
            return Err(error);
        }
    }

    log::debug!(
        target: "moonlink::writer",
        "Outbound queue closed, send loop exiting"
    );
    Ok(())
}

/// Cancel everything still queued but not yet written.
///
/// Returns the number of requests cancelled.
pub(crate) fn cancel_queued(
    rx: &mut mpsc::UnboundedReceiver<OutboundMessage>,
    pending: &PendingCalls,
) -> usize {
    let mut cancelled = 0;
    while let Ok(message) = rx.try_recv() {
        if let Some(request_id) = message.request_id() {
            if pending.fail(request_id, ClientError::Cancelled) {
                cancelled += 1;
            }
        }
    }
    cancelled
}

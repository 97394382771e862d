//! Ordered delivery of listener events.
//!
//! Producers (the supervisor, the receive loop, `disconnect()`) push events
//! into an unbounded channel without ever suspending. A single dispatcher task
//! drains the channel and awaits the listener for each event in turn.
//!
//! ```text
//! supervisor ───┐
//! reader     ───┼──► mpsc::UnboundedReceiver<ListenerEvent> ──► dispatcher ──► ClientListener
//! disconnect ───┘
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use super::listener::ClientListener;
use super::state::ConnectionState;
use super::tasks::panic_message;
use crate::error::ClientError;

/// Event queued for the listener.
#[derive(Debug)]
pub(crate) enum ListenerEvent {
    StateChanged(ConnectionState),
    Notification { method: String, params: Value },
    Exception(ClientError),
    /// Acknowledged once every event queued before it has been delivered.
    Flush(oneshot::Sender<()>),
}

/// Producer side of the event queue.
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    tx: mpsc::UnboundedSender<ListenerEvent>,
}

impl EventSender {
    pub(crate) fn state_changed(&self, state: ConnectionState) {
        self.send(ListenerEvent::StateChanged(state));
    }

    pub(crate) fn notification(&self, method: String, params: Value) {
        self.send(ListenerEvent::Notification { method, params });
    }

    pub(crate) fn exception(&self, error: ClientError) {
        self.send(ListenerEvent::Exception(error));
    }

    /// Wait until every previously queued event has reached the listener.
    ///
    /// Returns immediately if the dispatcher is gone.
    pub(crate) async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(ListenerEvent::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    fn send(&self, event: ListenerEvent) {
        if self.tx.send(event).is_err() {
            log::debug!(
                target: "moonlink::dispatcher",
                "Dispatcher stopped, dropping listener event"
            );
        }
    }
}

/// Create the event queue and the dispatcher loop that drains it.
///
/// The loop ends once every `EventSender` has been dropped.
pub(crate) fn event_channel(
    listener: Arc<dyn ClientListener>,
) -> (EventSender, impl std::future::Future<Output = ()> + Send + 'static) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, dispatch_loop(rx, listener))
}

async fn dispatch_loop(
    mut rx: mpsc::UnboundedReceiver<ListenerEvent>,
    listener: Arc<dyn ClientListener>,
) {
    while let Some(event) = rx.recv().await {
        deliver(event, listener.as_ref()).await;
    }

    log::debug!(
        target: "moonlink::dispatcher",
        "Dispatcher loop exited (channel closed)"
    );
}

/// Deliver one event. A panicking listener is logged and the loop continues.
async fn deliver(event: ListenerEvent, listener: &dyn ClientListener) {
    let delivery = match event {
        ListenerEvent::Flush(ack) => {
            let _ = ack.send(());
            return;
        }
        ListenerEvent::StateChanged(state) => {
            AssertUnwindSafe(listener.state_changed(state))
                .catch_unwind()
                .await
        }
        ListenerEvent::Notification { method, params } => {
            AssertUnwindSafe(listener.on_notification(&method, params))
                .catch_unwind()
                .await
        }
        ListenerEvent::Exception(error) => {
            AssertUnwindSafe(listener.on_exception(error))
                .catch_unwind()
                .await
        }
    };

    if let Err(payload) = delivery {
        log::error!(
            target: "moonlink::dispatcher",
            "Listener PANICKED: {}",
            panic_message(payload.as_ref())
        );
    }
}

//! Shared connection state.
//!
//! Holds what request issuers, the supervisor and `disconnect()` all touch:
//! the lifecycle state and the current connection epoch. Both live behind
//! one mutex so that "is the connection up?" and "which queue do I use?" are
//! answered together.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::actor::OutboundMessage;
use super::dispatcher::EventSender;
use super::handler::HandlerChain;
use super::pending::PendingCalls;
use super::scoped::ScopedRequest;
use super::state::ConnectionState;
use crate::error::{ClientError, ClientResult, LockResultExt};
use crate::protocol::{self, Params};

/// Pending-call table and outbound queue of one successful handshake.
#[derive(Debug, Clone)]
pub(crate) struct Epoch {
    pub(crate) pending: Arc<PendingCalls>,
    pub(crate) outbound: mpsc::UnboundedSender<OutboundMessage>,
}

#[derive(Debug)]
struct Inner {
    state: ConnectionState,
    epoch: Option<Epoch>,
}

#[derive(Debug)]
pub(crate) struct Connection {
    inner: Mutex<Inner>,
    events: EventSender,
    handlers: HandlerChain,
}

impl Connection {
    pub(crate) fn new(events: EventSender) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ConnectionState::Stopped,
                epoch: None,
            }),
            events,
            handlers: HandlerChain::default(),
        }
    }

    pub(crate) fn events(&self) -> &EventSender {
        &self.events
    }

    pub(crate) fn handlers(&self) -> &HandlerChain {
        &self.handlers
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.inner.lock().recover_poison("Connection::state").state
    }

    /// Move to `state`, notifying the listener if it actually changed.
    pub(crate) fn set_state(&self, state: ConnectionState) -> bool {
        let mut inner = self.inner.lock().recover_poison("Connection::set_state");
        self.transition(&mut inner, state)
    }

    /// Install a fresh epoch and enter `Connected`, unless a stop was
    /// requested in the meantime.
    pub(crate) fn activate(&self, epoch: Epoch, stop: &CancellationToken) -> bool {
        let mut inner = self.inner.lock().recover_poison("Connection::activate");
        if stop.is_cancelled() {
            return false;
        }
        inner.epoch = Some(epoch);
        self.transition(&mut inner, ConnectionState::Connected);
        true
    }

    /// Detach the current epoch; new requests fail with `NotConnected` from
    /// here on.
    pub(crate) fn take_epoch(&self) -> Option<Epoch> {
        self.inner
            .lock()
            .recover_poison("Connection::take_epoch")
            .epoch
            .take()
    }

    /// Signal the supervisor to stop, entering `Stopping` unless already
    /// `Stopped`.
    ///
    /// Both happen under the state lock, so the supervisor cannot slip a
    /// `Connected` in between.
    pub(crate) fn request_stop(&self, stop: &CancellationToken) {
        let mut inner = self.inner.lock().recover_poison("Connection::request_stop");
        if inner.state != ConnectionState::Stopped {
            self.transition(&mut inner, ConnectionState::Stopping);
        }
        stop.cancel();
    }

    /// Register and enqueue a call on the current epoch.
    ///
    /// Never suspends. Registration and enqueueing happen under the state
    /// lock, so teardown either sees the call in the table or the call sees
    /// no epoch.
    pub(crate) fn request(
        &self,
        method: &str,
        params: Option<&Params>,
        timeout: Duration,
    ) -> ClientResult<ScopedRequest> {
        let inner = self.inner.lock().recover_poison("Connection::request");
        if !inner.state.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let epoch = inner.epoch.as_ref().ok_or(ClientError::NotConnected)?;

        let handle = epoch.pending.register_new(Instant::now() + timeout);
        let request_id = handle.id();
        let message = protocol::build_request(request_id, method, params);
        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(e) => {
                epoch.pending.remove(request_id);
                return Err(e.into());
            }
        };

        if epoch
            .outbound
            .send(OutboundMessage::Request { payload, request_id })
            .is_err()
        {
            epoch.pending.remove(request_id);
            return Err(ClientError::NotConnected);
        }

        log::trace!(
            target: "moonlink::supervisor",
            "Queued {} as request {}",
            method,
            request_id
        );
        Ok(ScopedRequest::new(Arc::clone(&epoch.pending), handle))
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.inner
            .lock()
            .recover_poison("Connection::pending_count")
            .epoch
            .as_ref()
            .map_or(0, |epoch| epoch.pending.len())
    }

    fn transition(&self, inner: &mut Inner, state: ConnectionState) -> bool {
        if inner.state == state {
            return false;
        }
        log::debug!(
            target: "moonlink::supervisor",
            "Connection state {} -> {}",
            inner.state,
            state
        );
        inner.state = state;
        self.events.state_changed(state);
        true
    }
}

//! Awaitable call handles.
//!
//! A call is split in two halves joined by a oneshot channel:
//! - `CallSlot`: the settable side, stored in the pending-call table
//! - `CallHandle`: the awaitable side, held by the caller
//!
//! The slot's setters consume it, so a call can be settled at most once.
//! Whoever settles it first wins; later attempts have nothing to set.

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::ClientError;
use crate::protocol::{Reply, RequestId};

/// Final outcome of a call.
pub type CallOutcome = Result<Reply, ClientError>;

/// Create the two halves of a call with the given deadline.
pub(crate) fn call_pair(id: RequestId, deadline: Instant) -> (CallSlot, CallHandle) {
    let (tx, rx) = oneshot::channel();
    (
        CallSlot { tx },
        CallHandle {
            id,
            deadline,
            slot: HandleSlot::Waiting(rx),
        },
    )
}

/// Settable side of a call.
#[derive(Debug)]
pub(crate) struct CallSlot {
    tx: oneshot::Sender<CallOutcome>,
}

impl CallSlot {
    /// Settle the call with the server's reply.
    ///
    /// Returns `false` if the caller already stopped waiting.
    pub(crate) fn set_result(self, reply: Reply) -> bool {
        self.tx.send(Ok(reply)).is_ok()
    }

    /// Settle the call with a client-side failure.
    pub(crate) fn set_error(self, error: ClientError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }

    /// Abort the call; the waiter observes `ClientError::Cancelled`.
    pub(crate) fn cancel(self) -> bool {
        self.set_error(ClientError::Cancelled)
    }
}

#[derive(Debug)]
enum HandleSlot {
    Waiting(oneshot::Receiver<CallOutcome>),
    Done(CallOutcome),
}

/// Awaitable side of a call.
///
/// Once settled, the outcome is cached: [`CallHandle::wait`] can be called
/// again and returns the same value, even after the call has left the
/// pending-call table.
#[derive(Debug)]
pub struct CallHandle {
    id: RequestId,
    deadline: Instant,
    slot: HandleSlot,
}

impl CallHandle {
    /// Id of the request this handle waits on.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Instant after which waiting fails with `ClientError::Timeout`.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Check for an outcome without waiting.
    pub fn is_complete(&mut self) -> bool {
        let outcome = match &mut self.slot {
            HandleSlot::Done(_) => return true,
            HandleSlot::Waiting(rx) => match rx.try_recv() {
                Ok(outcome) => outcome,
                Err(oneshot::error::TryRecvError::Empty) => return false,
                Err(oneshot::error::TryRecvError::Closed) => Err(ClientError::Cancelled),
            },
        };
        self.slot = HandleSlot::Done(outcome);
        true
    }

    /// Wait for the outcome, up to the deadline.
    ///
    /// A slot dropped without being settled counts as a cancellation. Dropping
    /// this future before it completes leaves the handle waiting.
    pub async fn wait(&mut self) -> CallOutcome {
        let outcome = match &mut self.slot {
            HandleSlot::Done(outcome) => return outcome.clone(),
            HandleSlot::Waiting(rx) => match tokio::time::timeout_at(self.deadline, rx).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_)) => Err(ClientError::Cancelled),
                Err(_) => Err(ClientError::Timeout),
            },
        };
        self.slot = HandleSlot::Done(outcome.clone());
        outcome
    }
}

//! Scoped request context.

use std::sync::Arc;

use super::call::{CallHandle, CallOutcome};
use super::pending::PendingCalls;
use crate::protocol::RequestId;

/// A call issued on the current connection, bound to the epoch that carried it.
///
/// The context owns the caller's [`CallHandle`] and removes the call from its
/// pending-call table when dropped, whether the reply arrived, the wait
/// failed, or the awaiting future was abandoned. The table reference is the
/// one of the connection epoch the request went out on, so a reconnect in
/// between never lets this guard touch a newer table.
#[derive(Debug)]
pub struct ScopedRequest {
    table: Arc<PendingCalls>,
    handle: CallHandle,
}

impl ScopedRequest {
    pub(crate) fn new(table: Arc<PendingCalls>, handle: CallHandle) -> Self {
        Self { table, handle }
    }

    /// Id the request was sent with.
    pub fn id(&self) -> RequestId {
        self.handle.id()
    }

    /// Wait for the outcome of the call.
    ///
    /// Can be awaited again after completion; the settled outcome is returned
    /// each time.
    pub async fn response(&mut self) -> CallOutcome {
        self.handle.wait().await
    }

    /// Whether the call has been settled.
    pub fn is_complete(&mut self) -> bool {
        self.handle.is_complete()
    }
}

impl Drop for ScopedRequest {
    fn drop(&mut self) {
        if self.table.remove(self.handle.id()) {
            log::trace!(
                target: "moonlink::pending",
                "Dropped unsettled request {}",
                self.handle.id()
            );
        }
    }
}

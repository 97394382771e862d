//! Pending-call table.
//!
//! This module provides the table that tracks in-flight calls of one
//! connection epoch and routes replies to their waiters.
//!
//! - Before queuing a request, `register()` it to obtain the caller's handle
//! - The receive loop calls `resolve()` when a reply arrives
//! - Teardown calls `fail_all()` so no waiter is left hanging

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::time::Instant;

use super::call::{CallHandle, CallSlot, call_pair};
use crate::error::{ClientError, LockResultExt};
use crate::protocol::{Reply, RequestId};

/// Table of calls awaiting a reply, keyed by request id.
///
/// One table exists per connection epoch. It is shared between the request
/// issuers, the receive loop, the send loop and the supervisor; every
/// operation is a short critical section that never spans an `.await`.
#[derive(Debug, Default)]
pub(crate) struct PendingCalls {
    slots: Mutex<HashMap<RequestId, CallSlot>>,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a call with a specific id.
    ///
    /// Returns `None` if a call with this id is already pending.
    #[cfg(test)]
    pub(crate) fn register(&self, id: RequestId, deadline: Instant) -> Option<CallHandle> {
        let mut slots = self.slots.lock().recover_poison("PendingCalls::register");
        if slots.contains_key(&id) {
            return None;
        }
        let (slot, handle) = call_pair(id, deadline);
        slots.insert(id, slot);
        Some(handle)
    }

    /// Register a call under a freshly drawn id that is not outstanding.
    pub(crate) fn register_new(&self, deadline: Instant) -> CallHandle {
        let mut slots = self.slots.lock().recover_poison("PendingCalls::register_new");
        let mut id = RequestId::random();
        while slots.contains_key(&id) {
            id = RequestId::random();
        }
        let (slot, handle) = call_pair(id, deadline);
        slots.insert(id, slot);
        handle
    }

    /// Settle a pending call with the server's reply.
    ///
    /// Returns `true` if a call with this id was pending. The entry is
    /// removed either way the waiter fares.
    pub(crate) fn resolve(&self, id: RequestId, reply: Reply) -> bool {
        let slot = self.take(id);
        match slot {
            Some(slot) => {
                if !slot.set_result(reply) {
                    log::debug!(
                        target: "moonlink::pending",
                        "Reply for request {} arrived after its waiter left",
                        id
                    );
                }
                true
            }
            None => false,
        }
    }

    /// Fail a single pending call.
    pub(crate) fn fail(&self, id: RequestId, error: ClientError) -> bool {
        match self.take(id) {
            Some(slot) => {
                slot.set_error(error);
                true
            }
            None => false,
        }
    }

    /// Remove a call without settling it.
    ///
    /// Used by the scoped request guard on every exit path.
    pub(crate) fn remove(&self, id: RequestId) -> bool {
        self.take(id).is_some()
    }

    /// Fail every pending call with the given error.
    ///
    /// `ClientError::Cancelled` cancels the calls; any other error is
    /// delivered as-is so callers see what tore the connection down.
    pub(crate) fn fail_all(&self, error: &ClientError) -> usize {
        let entries: Vec<CallSlot> = {
            let mut slots = self.slots.lock().recover_poison("PendingCalls::fail_all");
            slots.drain().map(|(_, slot)| slot).collect()
        };

        let count = entries.len();
        for slot in entries {
            match error {
                ClientError::Cancelled => {
                    slot.cancel();
                }
                other => {
                    slot.set_error(other.clone());
                }
            }
        }
        count
    }

    /// Number of calls still awaiting a reply.
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().recover_poison("PendingCalls::len").len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: RequestId) -> bool {
        self.slots
            .lock()
            .recover_poison("PendingCalls::contains")
            .contains_key(&id)
    }

    fn take(&self, id: RequestId) -> Option<CallSlot> {
        self.slots.lock().recover_poison("PendingCalls::take").remove(&id)
    }
}

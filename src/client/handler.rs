//! Message handlers for uncorrelated inbound messages.
//!
//! Replies whose id no caller waits on (such as the greeting reply) and
//! server notifications are offered to the registered handlers in
//! registration order. Dispatch stops at the first handler that consumes the
//! message.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::LockResultExt;

/// Capability to consume inbound messages that no pending call claimed.
pub trait MessageHandler: Send + Sync {
    /// Inspect a message. Return `true` if it was consumed.
    fn handle(&self, message: &Value) -> bool;
}

impl<F> MessageHandler for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn handle(&self, message: &Value) -> bool {
        self(message)
    }
}

/// Ordered list of registered handlers.
#[derive(Default)]
pub(crate) struct HandlerChain {
    handlers: Mutex<Vec<Arc<dyn MessageHandler>>>,
}

impl HandlerChain {
    pub(crate) fn push(&self, handler: Arc<dyn MessageHandler>) {
        self.handlers
            .lock()
            .recover_poison("HandlerChain::push")
            .push(handler);
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.lock().recover_poison("HandlerChain::len").len()
    }

    /// Offer a message to each handler until one consumes it.
    ///
    /// Handlers run outside the lock, so a handler may register further
    /// handlers without deadlocking.
    pub(crate) fn dispatch(&self, message: &Value) -> bool {
        let snapshot: Vec<Arc<dyn MessageHandler>> = self
            .handlers
            .lock()
            .recover_poison("HandlerChain::dispatch")
            .clone();
        snapshot.iter().any(|handler| handler.handle(message))
    }
}

impl std::fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerChain")
            .field("handlers", &self.len())
            .finish()
    }
}

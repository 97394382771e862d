//! Outbound message types for the send loop.
//!
//! All messages pass through the connection epoch's queue to keep FIFO
//! ordering. The send loop consumes them and writes text frames.

use crate::protocol::RequestId;

/// Message waiting to be written to the socket.
#[derive(Debug)]
pub(crate) enum OutboundMessage {
    /// Request with a caller awaiting its reply.
    ///
    /// The request id must be registered in the epoch's pending-call table
    /// BEFORE queuing.
    Request {
        /// Serialized JSON-RPC request
        payload: String,
        /// Request ID for correlation (already registered)
        request_id: RequestId,
    },

    /// Request nobody waits on (the connection greeting).
    ///
    /// Its reply is not correlated and reaches the message handlers instead.
    Untracked(String),
}

impl OutboundMessage {
    pub(crate) fn into_payload(self) -> String {
        match self {
            OutboundMessage::Request { payload, .. } => payload,
            OutboundMessage::Untracked(payload) => payload,
        }
    }

    pub(crate) fn request_id(&self) -> Option<RequestId> {
        match self {
            OutboundMessage::Request { request_id, .. } => Some(*request_id),
            OutboundMessage::Untracked(_) => None,
        }
    }
}

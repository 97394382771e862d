//! Actor components of a live connection.
//!
//! # Components
//!
//! - `OutboundMessage`: Entry of the per-epoch FIFO queue
//! - `recv_loop`: Reads frames and routes replies, notifications and other messages
//! - `send_loop`: Single writer draining the outbound queue onto the socket

mod outbound_message;
mod reader;
mod writer;

pub(crate) use outbound_message::OutboundMessage;
pub(crate) use reader::{Inbox, recv_loop};
pub(crate) use writer::{cancel_queued, send_loop};

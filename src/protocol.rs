//! JSON-RPC 2.0 wire types for the websocket client.
//!
//! ## Module Structure
//!
//! - `request_id` - RequestId type for type-safe request ID handling
//! - `message` - Request builder, inbound classification and the `Reply` type

mod message;
mod request_id;

pub use message::{Inbound, Params, Reply, build_request, classify, decode};
pub use request_id::RequestId;

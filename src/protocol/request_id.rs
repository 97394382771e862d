//! JSON-RPC request ID type.
//!
//! This module provides a type-safe wrapper for request IDs, preventing
//! confusion with other integer types.

use rand::Rng;

/// JSON-RPC request ID.
///
/// Wraps `u64` to keep ids apart from other integers and to serve as the
/// pending-call table key.
///
/// # Id Assignment
///
/// Ids are drawn uniformly from `1..2^53` rather than from a counter, so a
/// client that reconnects (or a process that restarts) does not hand out an id
/// that a stale reply could still match. The upper bound keeps ids exactly
/// representable as JSON numbers in any consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Exclusive upper bound for generated ids (2^53).
    pub const MAX: u64 = 1 << 53;

    /// Create a new RequestId from a u64 value.
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Draw a fresh id from the uniform id space.
    pub fn random() -> Self {
        Self(rand::rng().random_range(1..Self::MAX))
    }

    /// Get the underlying u64 value.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Extract RequestId from a JSON-RPC message.
    ///
    /// Returns `None` if the "id" field is missing, null, negative or not an
    /// integer (notifications carry no id).
    pub fn from_json(message: &serde_json::Value) -> Option<Self> {
        message.get("id")?.as_u64().map(Self)
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<RequestId> for u64 {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

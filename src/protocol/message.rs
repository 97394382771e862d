//! Request builder and inbound message classification.

use serde_json::{Map, Value};

use super::request_id::RequestId;
use crate::error::{ClientError, ClientResult};

/// Keyword arguments of a call, sent as the JSON-RPC `params` object.
pub type Params = Map<String, Value>;

/// Build a JSON-RPC 2.0 request.
///
/// `params` is omitted from the payload when absent or empty, matching a call
/// made without keyword arguments.
pub fn build_request(id: RequestId, method: &str, params: Option<&Params>) -> Value {
    let mut request = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "id": id.as_u64(),
    });
    if let Some(params) = params.filter(|p| !p.is_empty()) {
        request["params"] = Value::Object(params.clone());
    }
    request
}

/// Decode a text frame into JSON.
pub fn decode(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text)
}

/// Resolution of a call that the server answered.
///
/// An error reply resolves the call rather than failing it: the awaiting
/// caller receives `Reply::Error` carrying the server's error object. Only the
/// client itself (deadline, teardown) produces a failed resolution. Use
/// [`Reply::into_result`] to fold error replies into `ClientError::Remote`.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The `result` member of a success reply
    Result(Value),
    /// The `error` member of an error reply
    Error(Value),
}

impl Reply {
    /// Whether the server answered with an error object.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Borrow the success payload, if any.
    pub fn result(&self) -> Option<&Value> {
        match self {
            Reply::Result(value) => Some(value),
            Reply::Error(_) => None,
        }
    }

    /// Convert into a `Result`, mapping error replies to `ClientError::Remote`.
    pub fn into_result(self) -> ClientResult<Value> {
        match self {
            Reply::Result(value) => Ok(value),
            Reply::Error(error) => Err(ClientError::Remote(error)),
        }
    }
}

/// Shape of a decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A reply correlated by numeric id
    Reply { id: RequestId, reply: Reply },
    /// A server-initiated message carrying a method name
    Notification { method: String, params: Value },
    /// Anything else (no usable id, no method)
    Other,
}

/// Classify a decoded message.
///
/// A message with a `result` or `error` member and a numeric id is a reply. A
/// message with a `method` member is a notification, even if it also carries
/// an id. A numeric id with neither member resolves as a `null` result.
pub fn classify(message: &Value) -> Inbound {
    let has_outcome = message.get("result").is_some() || message.get("error").is_some();

    if !has_outcome {
        if let Some(method) = message.get("method").and_then(Value::as_str) {
            return Inbound::Notification {
                method: method.to_string(),
                params: message.get("params").cloned().unwrap_or(Value::Null),
            };
        }
    }

    match RequestId::from_json(message) {
        Some(id) => {
            let reply = match message.get("error") {
                Some(error) if !error.is_null() => Reply::Error(error.clone()),
                _ => Reply::Result(message.get("result").cloned().unwrap_or(Value::Null)),
            };
            Inbound::Reply { id, reply }
        }
        None => Inbound::Other,
    }
}

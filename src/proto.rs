//! Wire protocol for the duplex socket and the HTTP auth envelope.
//!
//! Every outbound message is a [`RequestFrame`]; every inbound text frame is
//! an [`InboundFrame`] tagged by its `type` field. Payloads stay flexible
//! (`serde_json::Value`) — typed decoding happens at the API layer, next to
//! the call that knows what it asked for.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `reason` value on push frames that carry session update batches.
pub const REASON_SESSION_UPDATE: &str = "session_update";

/// Outbound RPC frame: `{"request": method, "id": "1", "payload": {...}}`.
///
/// The id is a decimal string counter starting at 1, never reused for the
/// life of the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub request: String,
    pub id: String,
    pub payload: Value,
}

/// Outcome discriminator on response frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Inbound frame, tagged by `type`.
///
/// `response` frames correlate to a pending request by id; `update` frames
/// are uncorrelated pushes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundFrame {
    Response {
        id: String,
        status: ResponseStatus,
        #[serde(default)]
        payload: Value,
    },
    Update {
        reason: String,
        #[serde(default)]
        time: f64,
        #[serde(default)]
        payload: Value,
    },
}

/// `{code, message}` payload carried by error responses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorPayload {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Envelope returned by the HTTP auth endpoints:
/// `{"response": T|null, "error": {code, message}|null}`.
///
/// Legacy endpoints return the bare value instead; see
/// `auth::process_response` for how both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RestEnvelope {
    pub response: Option<Value>,
    pub error: Option<ErrorPayload>,
}

#[cfg(test)]
#[path = "proto_test.rs"]
mod tests;

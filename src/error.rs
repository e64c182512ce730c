//! Error taxonomy for the client runtime.
//!
//! DESIGN
//! ======
//! Failures fall into three families with different recovery stories:
//! - connection errors (socket not open / closed mid-call) — recoverable by
//!   reconnecting, never retried here;
//! - protocol errors (server said no) — surfaced verbatim, except the
//!   auth-check code which becomes [`Error::TokenExpired`] so callers can
//!   trigger a refresh instead of failing outright;
//! - HTTP errors from the auth endpoints — a token-expired / client-error
//!   response is authoritative ("this token chain is dead, stop retrying"),
//!   anything else is transient.

/// Error codes the backend uses in `status: "error"` response payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadRequest = 4000,
    RequestParse = 4001,
    AuthCheck = 4002,
    Unauthorized = 4003,
    ContentNotFound = 4004,
    Internal = 5000,
}

impl ErrorCode {
    /// Wire integer for this code.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

/// Locally-generated code attached to connection-closed rejections.
pub const CODE_CONNECTION_CLOSED: i64 = -1;

/// Unified error type for socket, protocol, and HTTP auth failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The socket is not open, or closed while the call was in flight.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),
    /// The backend rejected the access token (auth-check failure).
    #[error("token expired: {0}")]
    TokenExpired(String),
    /// Any other server-side error response, surfaced verbatim.
    #[error("server error {code}: {message}")]
    Protocol { code: i64, message: String },
    /// The auth endpoint declared the refresh chain dead.
    #[error("http token expired: {0}")]
    HttpTokenExpired(String),
    /// A 4xx from an auth endpoint; treated as authoritative.
    #[error("http client error {code}: {message}")]
    HttpClient { code: i64, message: String },
    /// A non-4xx envelope error; treated as transient.
    #[error("http server error {code}: {message}")]
    HttpServer { code: i64, message: String },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("websocket transport failed: {0}")]
    WsTransport(Box<tokio_tungstenite::tungstenite::Error>),
    /// The connect host must be schema-less (`host[:port]`, no `scheme://`).
    #[error("invalid host `{0}`: must not contain a connection schema")]
    InvalidHost(String),
    /// The access token could not be decoded for its expiry claim.
    #[error("invalid access token: {0}")]
    InvalidToken(String),
    #[error("invalid bet amount `{0}`")]
    InvalidBet(String),
    #[error("no active game session")]
    NoActiveSession,
}

impl Error {
    /// Map a `{code, message}` error payload from a socket response frame.
    #[must_use]
    pub fn from_wire(code: i64, message: String) -> Self {
        if code == CODE_CONNECTION_CLOSED {
            return Self::ConnectionClosed(message);
        }
        if code == ErrorCode::AuthCheck.as_i64() {
            return Self::TokenExpired(message);
        }
        Self::Protocol { code, message }
    }

    /// Map a `{code, message}` error from an HTTP auth endpoint envelope
    /// (or a synthesized one built from a non-JSON failure body).
    #[must_use]
    pub fn from_http(code: i64, message: String) -> Self {
        if code == 401 {
            return Self::HttpTokenExpired(message);
        }
        if (400..500).contains(&code) {
            return Self::HttpClient { code, message };
        }
        Self::HttpServer { code, message }
    }

    /// Whether an auth endpoint has authoritatively invalidated the token
    /// chain. When true, persisted credentials must be erased and refresh
    /// retries stopped.
    #[must_use]
    pub fn is_authoritative_auth_failure(&self) -> bool {
        matches!(self, Self::HttpTokenExpired(_) | Self::HttpClient { .. })
    }

    pub(crate) fn closed() -> Self {
        Self::ConnectionClosed("websocket was closed".to_owned())
    }

    pub(crate) fn not_open() -> Self {
        Self::ConnectionClosed("websocket is not open".to_owned())
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

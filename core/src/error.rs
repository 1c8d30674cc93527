//! Error types for the FusionSolar client.
//!
//! # Design
//! Every failure the dispatcher reacts to differently gets its own variant:
//! `Throttled` is retried with backoff, `SessionInvalid` triggers a single
//! re-login, and everything else is surfaced as-is. Failure envelopes keep
//! the raw response body for diagnostics.

use serde_json::Value;
use thiserror::Error;

/// Errors returned by `FusionSolarClient` and the response validator.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx HTTP status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced an HTTP response (DNS, TLS, socket, timeout).
    #[error("transport failed: {0}")]
    Transport(String),

    /// Failure envelope with failCode 407: the vendor is rate limiting us.
    #[error("throttled by server (failCode 407): {body}")]
    Throttled { body: Value },

    /// Failure envelope with failCode 305, 306 or 307: the session token has
    /// expired or was never valid.
    #[error("session invalid (failCode {code}): {body}")]
    SessionInvalid { code: i64, body: Value },

    /// Any other failure envelope, including one without a failCode.
    #[error("operation failed (failCode {fail_code:?}): {body}")]
    Operation { fail_code: Option<i64>, body: Value },

    /// Login did not yield a usable session.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The response body could not be deserialized.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A payload was decoded but did not have the expected shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("config error: {0}")]
    Config(String),
}

impl ApiError {
    /// The vendor failCode carried by this error, if it came from a failure envelope.
    pub fn fail_code(&self) -> Option<i64> {
        match self {
            ApiError::Throttled { .. } => Some(crate::envelope::THROTTLED_CODE),
            ApiError::SessionInvalid { code, .. } => Some(*code),
            ApiError::Operation { fail_code, .. } => *fail_code,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

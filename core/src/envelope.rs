//! Response envelope validation.
//!
//! # Design
//! Every FusionSolar endpoint wraps its result in the same JSON envelope:
//! `{ "success": bool, "failCode": int, "message": string, "data": ... }`.
//! `validate` turns a raw `HttpResponse` into either the decoded body or a
//! classified `ApiError`, which is what the dispatcher branches on.

use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::http::HttpResponse;

/// failCode signalling that the caller is being rate limited.
pub const THROTTLED_CODE: i64 = 407;

/// failCodes signalling an expired or never-valid session token.
pub const SESSION_INVALID_CODES: [i64; 3] = [305, 306, 307];

/// What kind of remediation a failure envelope calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Throttled,
    SessionInvalid(i64),
    Other(Option<i64>),
}

/// Map a failCode (or its absence) to a `FailureKind`.
pub fn classify(fail_code: Option<i64>) -> FailureKind {
    match fail_code {
        Some(THROTTLED_CODE) => FailureKind::Throttled,
        Some(code) if SESSION_INVALID_CODES.contains(&code) => FailureKind::SessionInvalid(code),
        other => FailureKind::Other(other),
    }
}

/// Check the HTTP status and the envelope's `success` flag.
///
/// Returns the whole decoded body on success so callers can read `data` and
/// any sibling fields.
pub fn validate(response: &HttpResponse) -> Result<Value> {
    if !response.is_success() {
        return Err(ApiError::HttpError {
            status: response.status,
            body: response.body.clone(),
        });
    }

    let body: Value = serde_json::from_str(&response.body)
        .map_err(|e| ApiError::DeserializationError(e.to_string()))?;

    if body.get("success").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(body);
    }

    let fail_code = body.get("failCode").and_then(Value::as_i64);
    debug!(fail_code = ?fail_code, "failure envelope");
    Err(match classify(fail_code) {
        FailureKind::Throttled => ApiError::Throttled { body },
        FailureKind::SessionInvalid(code) => ApiError::SessionInvalid { code, body },
        FailureKind::Other(fail_code) => ApiError::Operation { fail_code, body },
    })
}

//! Request and response types exchanged between the codec and handlers.
//!
//! Request bodies reach handlers as a [`Payload`]: a JSON object that is
//! either the client's data or a degraded outcome marked with one of the
//! sentinel keys below. Handlers must check [`sentinel`] before trusting it.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// A decoded request body: string keys to arbitrary JSON values.
pub type Payload = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Sentinel keys
// ---------------------------------------------------------------------------

/// The body looked encrypted or structured but could not be decoded.
pub const ERROR_KEY: &str = "_error";

/// The body could not be read from the transport at all.
pub const PARSE_ERROR_KEY: &str = "_parse_error";

/// Every strategy failed; the key carries a truncated copy of the input.
pub const RAW_DATA_KEY: &str = "_raw_data";

/// All reserved keys, in the order they are checked.
pub const SENTINEL_KEYS: [&str; 3] = [ERROR_KEY, PARSE_ERROR_KEY, RAW_DATA_KEY];

/// Build a single-entry payload `{key: value}`.
pub fn single(key: &str, value: impl Into<serde_json::Value>) -> Payload {
    let mut map = Payload::new();
    map.insert(key.to_owned(), value.into());
    map
}

/// Returns the first sentinel key present in `payload` together with its
/// value rendered as text, or `None` for a regular payload.
pub fn sentinel(payload: &Payload) -> Option<(&'static str, String)> {
    SENTINEL_KEYS.iter().find_map(|key| {
        payload.get(*key).map(|v| {
            let text = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (*key, text)
        })
    })
}

/// Ensure `payload` is a regular payload carrying every key in `required`.
///
/// # Errors
///
/// Returns [`ServiceError::BadRequest`] if a sentinel key is present or if
/// any required key is missing. Missing keys are listed in the order given.
pub fn require_fields(payload: &Payload, required: &[&str]) -> Result<(), ServiceError> {
    if let Some((key, _)) = sentinel(payload) {
        return Err(ServiceError::BadRequest(format!(
            "request body could not be decoded ({key})"
        )));
    }
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|k| !payload.contains_key(*k))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Echo endpoint
// ---------------------------------------------------------------------------

/// Response body for `POST /echo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoResponse {
    /// The payload exactly as the decoder recovered it.
    pub received: Payload,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        Self::new(err.code(), err.message())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether a payload secret is configured, i.e. responses are encrypted.
    pub encryption_ready: bool,
}

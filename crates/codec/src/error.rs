//! Error types shared across crates.

use thiserror::Error;

/// Typed failure of the payload codec.
///
/// The transport boundary (request decoder, response writer) never lets these
/// escape; they exist so that stricter callers can act on the exact cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input is not base64, lacks the `Salted__` prefix, or the ciphertext is
    /// not a positive multiple of the block size.
    #[error("format error: {0}")]
    Format(&'static str),

    /// PKCS#7 padding did not validate after decryption: wrong passphrase,
    /// corrupted or truncated ciphertext.
    #[error("padding error: decrypted padding is inconsistent")]
    Padding,

    /// The shared payload secret is missing.
    #[error("config error: {0}")]
    Config(&'static str),
}

impl CodecError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CodecError::Format(_) => "FormatError",
            CodecError::Padding => "PaddingError",
            CodecError::Config(_) => "ConfigError",
        }
    }
}

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::NotFound`] → 404
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The decoded request body is unusable: sentinel payload or missing keys.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No route matches the request.
    #[error("not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
        }
    }

    /// Machine-readable code placed in the `code` field of error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::NotFound(_) => "not_found",
        }
    }

    /// The caller-safe message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            ServiceError::BadRequest(m) | ServiceError::NotFound(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ServiceError::NotFound("x".into()).http_status(), 404);
        assert_eq!(ServiceError::NotFound("x".into()).code(), "not_found");
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::BadRequest("Missing required fields: contest_id".into());
        assert!(e.to_string().contains("contest_id"));
        assert_eq!(e.message(), "Missing required fields: contest_id");
        assert_eq!(e.code(), "bad_request");
    }

    #[test]
    fn codec_error_kinds() {
        assert_eq!(CodecError::Format("x").kind(), "FormatError");
        assert_eq!(CodecError::Padding.kind(), "PaddingError");
        assert_eq!(CodecError::Config("x").kind(), "ConfigError");
        assert!(CodecError::Format("missing Salted__ prefix")
            .to_string()
            .contains("Salted__"));
    }
}

//! Encrypting response writer.
//!
//! Serialises a response value to JSON and wraps it in a `Salted__`
//! container. The writer never fails:
//!
//! | outcome | body |
//! |---|---|
//! | [`Rendered::Encrypted`] | base64 container text |
//! | [`Rendered::Plaintext`] | the JSON itself (degraded mode, see below) |
//! | [`Rendered::Failed`] | `{"error": "Error rendering response"}` |
//!
//! **Degraded mode.** When encryption is unavailable (no secret configured)
//! the plaintext JSON is sent. Availability wins over confidentiality here so
//! that a misconfigured deployment still answers; every such response emits a
//! `warn` event so the condition cannot go unnoticed.

use bytes::Bytes;
use serde::Serialize;
use tracing::{error, warn};

use crate::secret::PayloadCodec;

/// Body sent when the response value itself cannot be serialised.
pub const RENDER_ERROR_BODY: &[u8] = br#"{"error": "Error rendering response"}"#;

/// A rendered response body and how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Base64 container text.
    Encrypted(Bytes),
    /// Unencrypted JSON, sent because encryption failed.
    Plaintext(Bytes),
    /// The fixed [`RENDER_ERROR_BODY`].
    Failed(Bytes),
}

impl Rendered {
    /// Borrow the body bytes.
    pub fn body(&self) -> &Bytes {
        match self {
            Rendered::Encrypted(b) | Rendered::Plaintext(b) | Rendered::Failed(b) => b,
        }
    }

    /// Take the body bytes.
    pub fn into_body(self) -> Bytes {
        match self {
            Rendered::Encrypted(b) | Rendered::Plaintext(b) | Rendered::Failed(b) => b,
        }
    }

    /// Short label for logs.
    pub fn mode(&self) -> &'static str {
        match self {
            Rendered::Encrypted(_) => "encrypted",
            Rendered::Plaintext(_) => "plaintext",
            Rendered::Failed(_) => "failed",
        }
    }
}

/// Turns response values into wire bodies.
#[derive(Clone, Debug, Default)]
pub struct ResponseWriter {
    codec: PayloadCodec,
}

impl ResponseWriter {
    pub fn new(codec: PayloadCodec) -> Self {
        Self { codec }
    }

    /// Serialise and encrypt `payload`.
    pub fn render<T: Serialize + ?Sized>(&self, payload: &T) -> Rendered {
        let json = match serde_json::to_vec(payload) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "response serialisation failed");
                return Rendered::Failed(Bytes::from_static(RENDER_ERROR_BODY));
            }
        };

        match self.codec.encrypt(&json) {
            Ok(encrypted) => Rendered::Encrypted(Bytes::from(encrypted)),
            Err(e) => {
                warn!(
                    error = %e,
                    kind = e.kind(),
                    body_len = json.len(),
                    "response encryption unavailable; sending plaintext JSON"
                );
                Rendered::Plaintext(Bytes::from(json))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::PayloadSecret;
    use serde::Serializer;
    use serde_json::json;

    struct Unserialisable;

    impl Serialize for Unserialisable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot serialise"))
        }
    }

    fn writer(secret: &str) -> ResponseWriter {
        ResponseWriter::new(PayloadCodec::new(PayloadSecret::new(secret)))
    }

    #[test]
    fn encrypts_json_body() {
        let w = writer("secret");
        let rendered = w.render(&json!({"team": "rustaceans", "members": 3}));
        assert_eq!(rendered.mode(), "encrypted");
        let pt = crate::crypto::decrypt(rendered.body(), b"secret").unwrap();
        let back: serde_json::Value = serde_json::from_slice(&pt).unwrap();
        assert_eq!(back, json!({"team": "rustaceans", "members": 3}));
    }

    #[test]
    fn body_is_base64_text() {
        let rendered = writer("secret").render(&json!({"ok": true}));
        let body = rendered.into_body();
        assert!(body.starts_with(b"U2FsdGVkX1"));
        assert!(std::str::from_utf8(&body).is_ok());
    }

    #[test]
    fn missing_secret_falls_back_to_plaintext() {
        let w = ResponseWriter::default();
        let rendered = w.render(&json!({"detail": "Not found."}));
        assert!(matches!(rendered, Rendered::Plaintext(_)));
        let back: serde_json::Value = serde_json::from_slice(rendered.body()).unwrap();
        assert_eq!(back["detail"], "Not found.");
    }

    #[test]
    fn serialisation_failure_renders_fixed_error() {
        let rendered = writer("secret").render(&Unserialisable);
        assert_eq!(rendered, Rendered::Failed(Bytes::from_static(RENDER_ERROR_BODY)));
        let back: serde_json::Value = serde_json::from_slice(rendered.body()).unwrap();
        assert_eq!(back, json!({"error": "Error rendering response"}));
    }

    #[test]
    fn null_payload_is_still_encrypted() {
        let rendered = writer("secret").render(&serde_json::Value::Null);
        let pt = crate::crypto::decrypt(rendered.body(), b"secret").unwrap();
        assert_eq!(pt, b"null");
    }
}

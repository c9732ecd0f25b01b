//! The shared payload passphrase and the codec bound to it.

use std::sync::Arc;

use crate::crypto::{container, SaltedContainer};
use crate::error::CodecError;

/// The process-wide passphrase shared with browser clients.
///
/// Loaded once at startup and never mutated. `Debug` never prints it.
#[derive(Clone)]
pub struct PayloadSecret(Arc<str>);

impl PayloadSecret {
    /// Wrap a passphrase. Empty or whitespace-only values yield `None`.
    pub fn new(passphrase: impl AsRef<str>) -> Option<Self> {
        let passphrase = passphrase.as_ref();
        if passphrase.trim().is_empty() {
            None
        } else {
            Some(Self(Arc::from(passphrase)))
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for PayloadSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PayloadSecret([REDACTED])")
    }
}

/// Container encryption bound to an optional [`PayloadSecret`].
///
/// Without a secret every operation fails with [`CodecError::Config`]; the
/// transport layer turns that into its documented fallbacks.
#[derive(Clone, Debug, Default)]
pub struct PayloadCodec {
    secret: Option<PayloadSecret>,
}

impl PayloadCodec {
    /// Create a codec. `None` means encryption is unavailable.
    pub fn new(secret: Option<PayloadSecret>) -> Self {
        Self { secret }
    }

    /// Whether a secret is configured.
    pub fn is_ready(&self) -> bool {
        self.secret.is_some()
    }

    fn passphrase(&self) -> Result<&[u8], CodecError> {
        self.secret
            .as_ref()
            .map(PayloadSecret::as_bytes)
            .ok_or(CodecError::Config("PAYLOAD_SECRET is not configured"))
    }

    /// Fails with [`CodecError::Config`] when no secret is configured.
    pub fn ensure_ready(&self) -> Result<(), CodecError> {
        self.passphrase().map(|_| ())
    }

    /// Encrypt `plaintext` into base64 container text with a fresh salt.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(container::encrypt(plaintext, self.passphrase()?))
    }

    /// Strictly decode and decrypt base64 container text.
    ///
    /// The container shape is checked before the secret so that malformed
    /// input reports [`CodecError::Format`] even when no secret is set.
    pub fn decrypt(&self, container_b64: &[u8]) -> Result<Vec<u8>, CodecError> {
        let parsed = SaltedContainer::from_base64(container_b64)?;
        self.open(&parsed)
    }

    /// Decrypt an already parsed container.
    pub fn open(&self, container: &SaltedContainer) -> Result<Vec<u8>, CodecError> {
        container::open(container, self.passphrase()?)
    }
}

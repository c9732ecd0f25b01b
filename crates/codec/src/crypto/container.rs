//! `Salted__` container: AES-256-CBC with PKCS#7 padding, base64 transport.
//!
//! ```text
//! base64( "Salted__" || salt[8] || AES-256-CBC(key, iv, PKCS7(plaintext)) )
//! ```
//!
//! Byte-compatible with `openssl enc -aes-256-cbc -md md5 -a` and with
//! `CryptoJS.AES.encrypt(message, passphrase)`.

use aes::Aes256;
use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose},
    Engine as _,
};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{rngs::OsRng, RngCore};

use super::kdf::{derive_key_iv, SALT_LEN};
use crate::error::CodecError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Canonical padded base64, used for everything we emit and for decryption.
const STRICT: GeneralPurpose = general_purpose::STANDARD;

/// Accepts missing `=` padding. Only used to recognise container shape.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    general_purpose::PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Literal that opens every container.
pub const MAGIC: &[u8; 8] = b"Salted__";

/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// Length of `MAGIC` plus salt.
pub const HEADER_LEN: usize = MAGIC.len() + SALT_LEN;

/// A structurally valid container: salt plus block-aligned, non-empty ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltedContainer {
    pub salt: [u8; SALT_LEN],
    pub ciphertext: Vec<u8>,
}

impl SaltedContainer {
    /// Check the prefix and length of a raw (already base64-decoded) blob.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Format`] if the blob is shorter than the header,
    /// does not start with `Salted__`, or carries a ciphertext that is empty
    /// or not a multiple of [`BLOCK_LEN`].
    pub fn parse(blob: &[u8]) -> Result<Self, CodecError> {
        if blob.len() < HEADER_LEN {
            return Err(CodecError::Format("container shorter than 16 bytes"));
        }
        if &blob[..MAGIC.len()] != MAGIC {
            return Err(CodecError::Format("missing Salted__ prefix"));
        }
        let ciphertext = &blob[HEADER_LEN..];
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(CodecError::Format(
                "ciphertext length is not a positive multiple of the block size",
            ));
        }
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&blob[MAGIC.len()..HEADER_LEN]);
        Ok(Self {
            salt,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Decode base64 `text` and [`parse`](Self::parse) the result.
    pub fn from_base64(text: &[u8]) -> Result<Self, CodecError> {
        Self::parse(&decode_base64(text)?)
    }

    /// Raw container bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Base64 transport form of the container.
    pub fn to_base64(&self) -> Vec<u8> {
        STRICT.encode(self.to_bytes()).into_bytes()
    }
}

/// Check whether `text` has the shape of a container without decrypting it.
///
/// Missing `=` padding is tolerated here, unlike in [`decrypt`].
///
/// # Errors
///
/// Returns [`CodecError::Format`] describing why `text` is not a container.
pub fn container_shape(text: &[u8]) -> Result<SaltedContainer, CodecError> {
    SaltedContainer::parse(&decode_with(&LENIENT, text)?)
}

/// Standard-alphabet, padded base64 decode that ignores ASCII whitespace
/// (line-wrapped output from `openssl enc -a`).
pub fn decode_base64(text: &[u8]) -> Result<Vec<u8>, CodecError> {
    decode_with(&STRICT, text)
}

fn decode_with(engine: &GeneralPurpose, text: &[u8]) -> Result<Vec<u8>, CodecError> {
    let compact: Vec<u8> = text
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    engine
        .decode(compact)
        .map_err(|_| CodecError::Format("input is not valid base64"))
}

/// Encrypt `plaintext` under `passphrase` with a fresh random salt and return
/// the base64 container text.
pub fn encrypt(plaintext: &[u8], passphrase: &[u8]) -> Vec<u8> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    encrypt_with_salt(plaintext, passphrase, salt)
}

/// [`encrypt`] with a caller-chosen salt. Only for known-answer vectors and
/// tooling; production paths must use a fresh salt per message.
pub fn encrypt_with_salt(plaintext: &[u8], passphrase: &[u8], salt: [u8; SALT_LEN]) -> Vec<u8> {
    seal(plaintext, passphrase, salt).to_base64()
}

/// Encrypt into a [`SaltedContainer`] without base64 encoding.
pub fn seal(plaintext: &[u8], passphrase: &[u8], salt: [u8; SALT_LEN]) -> SaltedContainer {
    let km = derive_key_iv(passphrase, &salt);
    let ciphertext =
        Aes256CbcEnc::new(&km.key.into(), &km.iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    SaltedContainer { salt, ciphertext }
}

/// Decrypt a parsed container.
///
/// # Errors
///
/// Returns [`CodecError::Padding`] if the PKCS#7 padding does not validate.
pub fn open(container: &SaltedContainer, passphrase: &[u8]) -> Result<Vec<u8>, CodecError> {
    let km = derive_key_iv(passphrase, &container.salt);
    Aes256CbcDec::new(&km.key.into(), &km.iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&container.ciphertext)
        .map_err(|_| CodecError::Padding)
}

/// Decode and decrypt base64 container text.
///
/// # Errors
///
/// Returns [`CodecError::Format`] for invalid base64 or a malformed container
/// (the cipher is never invoked in that case) and [`CodecError::Padding`]
/// when the decrypted padding is inconsistent.
pub fn decrypt(container_b64: &[u8], passphrase: &[u8]) -> Result<Vec<u8>, CodecError> {
    let container = SaltedContainer::from_base64(container_b64)?;
    open(&container, passphrase)
}

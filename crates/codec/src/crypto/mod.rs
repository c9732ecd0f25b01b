//! Passphrase-based payload encryption primitives.
//!
//! This module is intentionally free of HTTP dependencies.
//!
//! # Ciphertext format
//!
//! ```text
//! base64( "Salted__" || salt[8] || AES-256-CBC(PKCS7(plaintext)) )
//! ```
//!
//! Key and IV come from the MD5 `EVP_BytesToKey` derivation in [`kdf`].

pub mod container;
pub mod kdf;

pub use container::{container_shape, decrypt, encrypt, SaltedContainer, BLOCK_LEN};
pub use kdf::{derive, derive_key_iv, KeyMaterial, IV_LEN, KEY_LEN, SALT_LEN};

//! OpenSSL `EVP_BytesToKey` (MD5, one iteration) key and IV derivation.
//!
//! This is the derivation CryptoJS applies when handed a passphrase instead
//! of a key. It is weak by modern standards and must stay exactly as is:
//! browser clients derive the same bytes from the same passphrase and salt.

use md5::{Digest, Md5};

/// Byte length of an AES-256 key.
pub const KEY_LEN: usize = 32;

/// Byte length of the CBC initialisation vector (one AES block).
pub const IV_LEN: usize = 16;

/// Byte length of the per-message salt.
pub const SALT_LEN: usize = 8;

/// Derive `total_len` bytes from `passphrase` and `salt`.
///
/// `D_1 = MD5(passphrase ++ salt)`, `D_n = MD5(D_{n-1} ++ passphrase ++ salt)`;
/// the blocks are concatenated and truncated to `total_len`.
pub fn derive(passphrase: &[u8], salt: &[u8], total_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(total_len + 16);
    let mut prev: Option<[u8; 16]> = None;
    while out.len() < total_len {
        let mut hasher = Md5::new();
        if let Some(block) = &prev {
            hasher.update(block);
        }
        hasher.update(passphrase);
        hasher.update(salt);
        let mut block = [0u8; 16];
        block.copy_from_slice(&hasher.finalize());
        out.extend_from_slice(&block);
        prev = Some(block);
    }
    out.truncate(total_len);
    out
}

/// Key and IV for one encrypt or decrypt call.
///
/// Zeroed on drop and never printed.
pub struct KeyMaterial {
    pub key: [u8; KEY_LEN],
    pub iv: [u8; IV_LEN],
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.key.iter_mut().for_each(|b| *b = 0);
        self.iv.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

/// Derive the AES-256 key and CBC IV for `salt`.
pub fn derive_key_iv(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> KeyMaterial {
    let mut bytes = derive(passphrase, salt, KEY_LEN + IV_LEN);
    let mut material = KeyMaterial {
        key: [0u8; KEY_LEN],
        iv: [0u8; IV_LEN],
    };
    material.key.copy_from_slice(&bytes[..KEY_LEN]);
    material.iv.copy_from_slice(&bytes[KEY_LEN..]);
    bytes.iter_mut().for_each(|b| *b = 0);
    material
}

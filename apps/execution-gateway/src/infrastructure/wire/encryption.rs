//! Body encryption.
//!
//! `ChaChaCipher` seals with ChaCha20-Poly1305 under a fresh random nonce per
//! message; the nonce travels in front of the ciphertext.

use std::fmt;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};

use super::WireError;

/// Seals compressed bodies before they hit the socket.
pub trait Cipher: Send + Sync + fmt::Debug {
    /// Cipher name for logs.
    fn name(&self) -> &'static str;

    /// Encrypt a body.
    ///
    /// # Errors
    ///
    /// Returns error if the cipher fails.
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, WireError>;

    /// Decrypt a body.
    ///
    /// # Errors
    ///
    /// Returns error if the body is truncated or fails authentication.
    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, WireError>;
}

/// Pass-through cipher.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEncryption;

impl Cipher for NoEncryption {
    fn name(&self) -> &'static str {
        "none"
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, WireError> {
        Ok(plaintext.to_vec())
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, WireError> {
        Ok(sealed.to_vec())
    }
}

/// ChaCha20-Poly1305 with a prefixed 12-byte nonce.
pub struct ChaChaCipher {
    cipher: ChaCha20Poly1305,
}

impl ChaChaCipher {
    /// Key length in bytes.
    pub const KEY_LEN: usize = 32;
    /// Nonce length in bytes.
    pub const NONCE_LEN: usize = 12;
    /// Authentication tag length in bytes.
    pub const TAG_LEN: usize = 16;

    /// Create from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self, WireError> {
        let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| WireError::InvalidKey {
            message: format!("expected {} bytes, got {}", Self::KEY_LEN, key.len()),
        })?;
        Ok(Self { cipher })
    }

    /// Create from a hex-encoded key.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not hex or not 32 bytes.
    pub fn from_hex(key_hex: &str) -> Result<Self, WireError> {
        let key = hex::decode(key_hex.trim()).map_err(|e| WireError::InvalidKey {
            message: e.to_string(),
        })?;
        Self::new(&key)
    }
}

impl fmt::Debug for ChaChaCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaChaCipher").finish_non_exhaustive()
    }
}

impl Cipher for ChaChaCipher {
    fn name(&self) -> &'static str {
        "chacha20poly1305"
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, WireError> {
        let nonce_bytes: [u8; Self::NONCE_LEN] = rand::random();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| WireError::Encryption {
                message: e.to_string(),
            })?;

        let mut sealed = Vec::with_capacity(Self::NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, WireError> {
        if sealed.len() < Self::NONCE_LEN + Self::TAG_LEN {
            return Err(WireError::Decryption {
                message: format!("sealed body of {} bytes is truncated", sealed.len()),
            });
        }
        let (nonce, ciphertext) = sealed.split_at(Self::NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| WireError::Decryption {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn sealed_body_opens_with_same_key() {
        let cipher = ChaChaCipher::from_hex(KEY_HEX).unwrap();
        let sealed = cipher.seal(b"cancel O-1").unwrap();

        assert_eq!(
            sealed.len(),
            ChaChaCipher::NONCE_LEN + b"cancel O-1".len() + ChaChaCipher::TAG_LEN
        );
        assert_eq!(cipher.open(&sealed).unwrap(), b"cancel O-1");
    }

    #[test]
    fn nonces_differ_per_message() {
        let cipher = ChaChaCipher::from_hex(KEY_HEX).unwrap();
        let first = cipher.seal(b"same").unwrap();
        let second = cipher.seal(b"same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn tampered_body_fails_authentication() {
        let cipher = ChaChaCipher::from_hex(KEY_HEX).unwrap();
        let mut sealed = cipher.seal(b"modify O-1").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;

        assert!(matches!(
            cipher.open(&sealed),
            Err(WireError::Decryption { .. })
        ));
    }

    #[test]
    fn short_key_is_rejected() {
        assert!(matches!(
            ChaChaCipher::from_hex("0011"),
            Err(WireError::InvalidKey { .. })
        ));
        assert!(matches!(
            ChaChaCipher::from_hex("not-hex"),
            Err(WireError::InvalidKey { .. })
        ));
    }

    #[test]
    fn truncated_body_is_rejected() {
        let cipher = ChaChaCipher::from_hex(KEY_HEX).unwrap();
        assert!(cipher.open(&[0u8; 8]).is_err());
    }
}

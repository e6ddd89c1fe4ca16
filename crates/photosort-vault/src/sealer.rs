//! AEAD sealing for token material
//!
//! The [`Sealer`] trait is a capability interface: anything that can
//! authenticated-encrypt and decrypt byte strings with a server-held key
//! satisfies the vault's needs. The production implementation is
//! XChaCha20-Poly1305 with the key derived from a server-side secret; the
//! 24-byte random nonce is prepended to the ciphertext.

use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

/// Length of the XChaCha20-Poly1305 nonce prepended to sealed blobs
const NONCE_LEN: usize = 24;

/// Errors from sealing or unsealing token material
#[derive(Debug, Error)]
pub enum SealError {
    /// Encryption failed
    #[error("Sealing failed: {0}")]
    Seal(String),

    /// Decryption or authentication failed (wrong key or tampered data)
    #[error("Unsealing failed: {0}")]
    Open(String),

    /// The sealed blob is structurally invalid
    #[error("Malformed sealed blob: {0}")]
    Malformed(String),
}

/// Capability trait for authenticated encryption of token material
pub trait Sealer: Send + Sync {
    /// Seals plaintext bytes into an opaque blob
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, SealError>;

    /// Opens a sealed blob back into plaintext bytes
    fn open(&self, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, SealError>;
}

/// XChaCha20-Poly1305 sealer keyed from a server-side secret
///
/// The key is `SHA-256(secret)`; the secret comes from server configuration,
/// never from user input. Each seal draws a fresh random nonce, so sealing
/// the same plaintext twice yields different blobs.
pub struct XChaChaSealer {
    cipher: XChaCha20Poly1305,
}

impl XChaChaSealer {
    /// Derives the sealing key from a server-side secret string
    pub fn from_secret(secret: &str) -> Self {
        let digest: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        let key = Key::from_slice(&digest);
        Self {
            cipher: XChaCha20Poly1305::new(key),
        }
    }
}

impl Sealer for XChaChaSealer {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, SealError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| SealError::Seal(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(nonce.as_slice());
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open(&self, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, SealError> {
        if sealed.len() < NONCE_LEN {
            return Err(SealError::Malformed(format!(
                "blob of {} bytes is shorter than the nonce",
                sealed.len()
            )));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|e| SealError::Open(e.to_string()))?;
        Ok(Zeroizing::new(plaintext))
    }
}

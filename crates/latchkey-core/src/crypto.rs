//! Crypto capability consumed by the classifier.
//!
//! The primitives live outside this crate. Handshake state, marker stripping
//! and key bookkeeping are owned here, so the capability only has to decrypt
//! and kick off authentication.

use thiserror::Error;

/// Decryption failure reported by a [`CryptoCapability`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("decryption failed: {reason}")]
pub struct DecryptError {
    /// Why the ciphertext was rejected
    pub reason: String,
}

impl DecryptError {
    /// Create a decryption error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Opaque cryptographic capability.
///
/// # Invariants
///
/// - `decrypt` is only called after the handshake reached `Authenticated`
/// - `start_authentication` is called at most once per `Idle -> Authenticating`
///   transition; the outcome is reported back through the handshake
///   controller
pub trait CryptoCapability {
    /// Decrypt `ciphertext` received from `peer_address`.
    fn decrypt(&self, peer_address: &str, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError>;

    /// Begin the authentication handshake.
    fn start_authentication(&self);
}

impl<C: CryptoCapability + ?Sized> CryptoCapability for &C {
    fn decrypt(&self, peer_address: &str, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError> {
        (**self).decrypt(peer_address, ciphertext)
    }

    fn start_authentication(&self) {
        (**self).start_authentication();
    }
}

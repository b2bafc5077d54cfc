//! Simulated crypto capability.
//!
//! Real AEAD with deterministic keys: every peer gets a key derived from a
//! shared secret and its address, and nonces come from a seeded RNG. Bodies
//! sealed here decrypt through the classifier exactly like production
//! payloads would.
//!
//! ```text
//! shared secret ──HKDF(address)──> peer key
//! seeded RNG ──> 24-byte nonce
//! body = <<ENC>> base64(nonce || XChaCha20-Poly1305(plaintext))
//! ```

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use hkdf::Hkdf;
use latchkey_core::{CryptoCapability, DecryptError, encode_encrypted_body};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

/// Label used for peer key derivation
const PEER_KEY_LABEL: &[u8] = b"latchkeySimPeerV1";

/// Size of the `XChaCha20` nonce prefixed to every ciphertext
const NONCE_SIZE: usize = 24;

/// Deterministic [`CryptoCapability`] for tests.
///
/// Clones share the RNG and the authentication counter.
#[derive(Clone)]
pub struct SimCrypto {
    secret: [u8; 32],
    rng: Arc<Mutex<ChaCha20Rng>>,
    auth_starts: Arc<AtomicUsize>,
}

impl SimCrypto {
    /// Create a capability with a secret and nonce stream derived from `seed`.
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut secret = [0u8; 32];
        rng.fill_bytes(&mut secret);

        Self { secret, rng: Arc::new(Mutex::new(rng)), auth_starts: Arc::new(AtomicUsize::new(0)) }
    }

    /// Encrypt `plaintext` as if `peer_address` had sent it, framed as a
    /// complete encrypted body.
    pub fn seal(&self, peer_address: &str, plaintext: &[u8]) -> Vec<u8> {
        encode_encrypted_body(&self.encrypt(peer_address, plaintext))
    }

    /// Raw ciphertext (`nonce || sealed`) for `plaintext` from `peer_address`.
    pub fn encrypt(&self, peer_address: &str, plaintext: &[u8]) -> Vec<u8> {
        let mut nonce = [0u8; NONCE_SIZE];
        #[allow(clippy::expect_used)]
        self.rng.lock().expect("Mutex poisoned").fill_bytes(&mut nonce);

        let cipher = XChaCha20Poly1305::new(&self.peer_key(peer_address).into());
        let Ok(sealed) = cipher.encrypt(XNonce::from_slice(&nonce), plaintext) else {
            unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
        };

        let mut ciphertext = Vec::with_capacity(NONCE_SIZE + sealed.len());
        ciphertext.extend_from_slice(&nonce);
        ciphertext.extend_from_slice(&sealed);
        ciphertext
    }

    /// Number of times `start_authentication` was called.
    pub fn auth_starts(&self) -> usize {
        self.auth_starts.load(Ordering::SeqCst)
    }

    fn peer_key(&self, peer_address: &str) -> [u8; 32] {
        let hkdf = Hkdf::<Sha256>::new(None, &self.secret);

        let mut info = Vec::with_capacity(PEER_KEY_LABEL.len() + peer_address.len());
        info.extend_from_slice(PEER_KEY_LABEL);
        info.extend_from_slice(peer_address.as_bytes());

        let mut key = [0u8; 32];
        let Ok(()) = hkdf.expand(&info, &mut key) else {
            unreachable!("32 bytes is a valid HKDF-SHA256 output length");
        };

        key
    }
}

impl CryptoCapability for SimCrypto {
    fn decrypt(&self, peer_address: &str, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError> {
        if ciphertext.len() < NONCE_SIZE {
            return Err(DecryptError::new(format!(
                "ciphertext too short: {} bytes",
                ciphertext.len()
            )));
        }

        let (nonce, sealed) = ciphertext.split_at(NONCE_SIZE);
        let cipher = XChaCha20Poly1305::new(&self.peer_key(peer_address).into());

        cipher
            .decrypt(XNonce::from_slice(nonce), sealed)
            .map_err(|_| DecryptError::new("authentication failed"))
    }

    fn start_authentication(&self) {
        let starts = self.auth_starts.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(starts, "simulated authentication started");
    }
}

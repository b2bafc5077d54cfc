//! Storage abstraction for accepted keys
//!
//! Trait-based abstraction for persisting accepted peer keys. The trait is
//! synchronous (no async) to match the single control thread that drives the
//! registry.

mod chaotic;
mod memory;
mod redb;

use std::collections::BTreeMap;

pub use chaotic::ChaoticKeyStore;
pub use memory::MemoryKeyStore;
use serde::{Deserialize, Serialize};

pub use self::redb::RedbKeyStore;
use crate::RegistryError;

/// Identifier of an accepted key.
///
/// Allocated by the store, strictly increasing, and never reused by the same
/// store even after the key is deleted.
pub type KeyId = u64;

/// An accepted peer key as persisted by a [`KeyStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKey {
    /// Address of the peer the key belongs to.
    pub peer_address: String,
    /// Opaque public key material, as announced by the peer.
    pub key_material: Vec<u8>,
    /// Unix timestamp (seconds) when the user accepted the key.
    pub accepted_at_secs: u64,
}

/// Storage abstraction for accepted keys
///
/// Must be Clone (shared between the registry and management surfaces),
/// Send + Sync, and synchronous. Implementations share internal state via
/// Arc, so clones access the same underlying storage.
///
/// # Invariants
///
/// - At most one key per peer address
/// - Every mutation is atomic: a concurrent reader sees the store either
///   before or after it, never a partially removed entry
/// - "Not found" is never an error
pub trait KeyStore: Clone + Send + Sync + 'static {
    /// Store a key, returning its id.
    ///
    /// If the peer already has a key, the material and timestamp are replaced
    /// and the existing id is returned. Otherwise a fresh id is allocated.
    fn upsert_key(&self, key: &StoredKey) -> Result<KeyId, RegistryError>;

    /// All stored keys ordered by id.
    fn load_keys(&self) -> Result<BTreeMap<KeyId, StoredKey>, RegistryError>;

    /// Key stored for `peer_address`. `None` if the peer has no key.
    fn find_by_address(
        &self,
        peer_address: &str,
    ) -> Result<Option<(KeyId, StoredKey)>, RegistryError>;

    /// Remove the key with `id`.
    ///
    /// Returns whether a key was removed. Removing an absent id is a no-op.
    fn remove_key(&self, id: KeyId) -> Result<bool, RegistryError>;

    /// Number of stored keys.
    fn key_count(&self) -> Result<usize, RegistryError> {
        self.load_keys().map(|keys| keys.len())
    }
}

//! Registry of accepted peer keys.
//!
//! Thin, logged layer over a [`KeyStore`] that exposes the operations the
//! control plane and key management surfaces need. Display labels are applied
//! at listing time and never stored.

use std::collections::BTreeMap;

use crate::{
    IdentityResolver, RegistryError,
    display::display_label,
    store::{KeyId, KeyStore, StoredKey},
};

/// An accepted key as presented to a management surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    /// Registry id of the key.
    pub id: KeyId,
    /// Address of the peer the key belongs to.
    pub peer_address: String,
    /// Raw address or resolved display label.
    pub description: String,
}

/// Result of listing the registry for display.
///
/// An empty registry is a valid state. Callers render a "no keys" affordance
/// for [`KeyListing::Empty`] instead of treating it as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyListing {
    /// No keys have been accepted.
    Empty,
    /// Accepted keys ordered by id.
    Keys(Vec<KeyEntry>),
}

impl KeyListing {
    /// Number of listed keys.
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Keys(entries) => entries.len(),
        }
    }

    /// True when no keys are listed.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Listed entries. Empty slice for [`KeyListing::Empty`].
    pub fn entries(&self) -> &[KeyEntry] {
        match self {
            Self::Empty => &[],
            Self::Keys(entries) => entries,
        }
    }
}

/// Registry of accepted peer public keys.
///
/// Clone shares the same underlying store.
///
/// # Invariants
///
/// - `delete(id)` followed by `list()` never contains `id`
/// - Operations never fail for "not found", only for storage failure
/// - `has_key` never mutates the store
#[derive(Clone)]
pub struct KeyRegistry<S: KeyStore> {
    store: S,
}

impl<S: KeyStore> KeyRegistry<S> {
    /// Create a registry over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Accept a key announced by `peer_address`.
    ///
    /// Replaces the material if the peer already has a key, keeping its id.
    pub fn insert(
        &self,
        peer_address: &str,
        key_material: &[u8],
        accepted_at_secs: u64,
    ) -> Result<KeyId, RegistryError> {
        let id = self.store.upsert_key(&StoredKey {
            peer_address: peer_address.to_string(),
            key_material: key_material.to_vec(),
            accepted_at_secs,
        })?;

        tracing::info!(id, peer = peer_address, "accepted public key");

        Ok(id)
    }

    /// All accepted keys as id -> raw peer address.
    pub fn list(&self) -> Result<BTreeMap<KeyId, String>, RegistryError> {
        Ok(self
            .store
            .load_keys()?
            .into_iter()
            .map(|(id, key)| (id, key.peer_address))
            .collect())
    }

    /// All accepted keys with descriptions labelled through `resolver`.
    pub fn entries<R: IdentityResolver + ?Sized>(
        &self,
        resolver: &R,
    ) -> Result<Vec<KeyEntry>, RegistryError> {
        Ok(self
            .store
            .load_keys()?
            .into_iter()
            .map(|(id, key)| KeyEntry {
                id,
                description: display_label(&key.peer_address, resolver),
                peer_address: key.peer_address,
            })
            .collect())
    }

    /// Registry contents ready for display.
    pub fn listing<R: IdentityResolver + ?Sized>(
        &self,
        resolver: &R,
    ) -> Result<KeyListing, RegistryError> {
        let entries = self.entries(resolver)?;

        if entries.is_empty() { Ok(KeyListing::Empty) } else { Ok(KeyListing::Keys(entries)) }
    }

    /// Remove the key with `id`. Absent ids are a no-op.
    pub fn delete(&self, id: KeyId) -> Result<(), RegistryError> {
        if self.store.remove_key(id)? {
            tracing::info!(id, "deleted public key");
        } else {
            tracing::debug!(id, "delete of unknown key id ignored");
        }

        Ok(())
    }

    /// Check if `peer_address` has an accepted key.
    pub fn has_key(&self, peer_address: &str) -> Result<bool, RegistryError> {
        Ok(self.store.find_by_address(peer_address)?.is_some())
    }

    /// Key material accepted for `peer_address`. `None` if the peer has none.
    pub fn key_material(&self, peer_address: &str) -> Result<Option<Vec<u8>>, RegistryError> {
        Ok(self.store.find_by_address(peer_address)?.map(|(_, key)| key.key_material))
    }

    /// Number of accepted keys.
    pub fn len(&self) -> Result<usize, RegistryError> {
        self.store.key_count()
    }

    /// True when no keys are accepted.
    pub fn is_empty(&self) -> Result<bool, RegistryError> {
        Ok(self.len()? == 0)
    }
}

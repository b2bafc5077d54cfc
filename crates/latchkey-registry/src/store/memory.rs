#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

use super::{KeyId, KeyStore, StoredKey};
use crate::RegistryError;

/// In-memory key store for testing and simulation
///
/// Keys live in a `BTreeMap` ordered by id, with a secondary address index so
/// presence checks are O(1). All state is wrapped in Arc<Mutex<>> to allow
/// Clone and concurrent access. Uses `lock().expect()` which will panic if the
/// mutex is poisoned - acceptable for test code.
#[derive(Clone)]
pub struct MemoryKeyStore {
    inner: Arc<Mutex<MemoryKeyStoreInner>>,
}

struct MemoryKeyStoreInner {
    /// Accepted keys by id
    keys: BTreeMap<KeyId, StoredKey>,

    /// `peer_address` -> id of that peer's key
    by_address: HashMap<String, KeyId>,

    /// Next id to allocate (ids start at 1)
    next_id: KeyId,
}

impl MemoryKeyStore {
    /// Create a new empty `MemoryKeyStore`
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryKeyStoreInner {
                keys: BTreeMap::new(),
                by_address: HashMap::new(),
                next_id: 1,
            })),
        }
    }

    /// Id the next new peer would receive.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    pub fn peek_next_id(&self) -> KeyId {
        self.inner.lock().expect("Mutex poisoned").next_id
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for MemoryKeyStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn upsert_key(&self, key: &StoredKey) -> Result<KeyId, RegistryError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let id = match inner.by_address.get(&key.peer_address) {
            Some(&existing) => existing,
            None => {
                let id = inner.next_id;
                inner.next_id += 1;
                inner.by_address.insert(key.peer_address.clone(), id);
                id
            },
        };

        inner.keys.insert(id, key.clone());

        debug_assert_eq!(inner.keys.len(), inner.by_address.len());

        Ok(id)
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn load_keys(&self) -> Result<BTreeMap<KeyId, StoredKey>, RegistryError> {
        Ok(self.inner.lock().expect("Mutex poisoned").keys.clone())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn find_by_address(
        &self,
        peer_address: &str,
    ) -> Result<Option<(KeyId, StoredKey)>, RegistryError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        Ok(inner
            .by_address
            .get(peer_address)
            .and_then(|id| inner.keys.get(id).map(|key| (*id, key.clone()))))
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn remove_key(&self, id: KeyId) -> Result<bool, RegistryError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        match inner.keys.remove(&id) {
            Some(key) => {
                inner.by_address.remove(&key.peer_address);
                Ok(true)
            },
            None => Ok(false),
        }
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn key_count(&self) -> Result<usize, RegistryError> {
        Ok(self.inner.lock().expect("Mutex poisoned").keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(address: &str, material: &[u8]) -> StoredKey {
        StoredKey {
            peer_address: address.to_string(),
            key_material: material.to_vec(),
            accepted_at_secs: 0,
        }
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = MemoryKeyStore::new();
        assert!(store.load_keys().unwrap().is_empty());
        assert_eq!(store.key_count().unwrap(), 0);
        assert_eq!(store.peek_next_id(), 1);
    }

    #[test]
    fn test_upsert_allocates_sequential_ids() {
        let store = MemoryKeyStore::new();

        assert_eq!(store.upsert_key(&key("+1", b"a")).unwrap(), 1);
        assert_eq!(store.upsert_key(&key("+2", b"b")).unwrap(), 2);
        assert_eq!(store.upsert_key(&key("+3", b"c")).unwrap(), 3);

        let ids: Vec<KeyId> = store.load_keys().unwrap().into_keys().collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_upsert_same_address_replaces_material() {
        let store = MemoryKeyStore::new();

        let first = store.upsert_key(&key("+1", b"old")).unwrap();
        let second = store.upsert_key(&key("+1", b"new")).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.key_count().unwrap(), 1);

        let (_, stored) = store.find_by_address("+1").unwrap().unwrap();
        assert_eq!(stored.key_material, b"new");
    }

    #[test]
    fn test_remove_key() {
        let store = MemoryKeyStore::new();
        let id = store.upsert_key(&key("+1", b"a")).unwrap();

        assert!(store.remove_key(id).unwrap());
        assert!(store.find_by_address("+1").unwrap().is_none());
        assert!(store.load_keys().unwrap().is_empty());
    }

    #[test]
    fn test_remove_absent_key_is_noop() {
        let store = MemoryKeyStore::new();
        store.upsert_key(&key("+1", b"a")).unwrap();

        assert!(!store.remove_key(42).unwrap());
        assert_eq!(store.key_count().unwrap(), 1);
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let store = MemoryKeyStore::new();
        let id = store.upsert_key(&key("+1", b"a")).unwrap();
        store.remove_key(id).unwrap();

        let next = store.upsert_key(&key("+1", b"a")).unwrap();
        assert_ne!(id, next);
    }

    #[test]
    fn test_clone_shares_state() {
        let store1 = MemoryKeyStore::new();
        let store2 = store1.clone();

        store1.upsert_key(&key("+1", b"a")).unwrap();
        assert!(store2.find_by_address("+1").unwrap().is_some());
    }
}

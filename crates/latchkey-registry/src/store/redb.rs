//! Redb-backed durable key store.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. Every
//! mutation is a single write transaction, so a reader never observes a
//! partially removed key.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use redb::{Database, ReadableTable, TableDefinition};

use super::{KeyId, KeyStore, StoredKey};
use crate::RegistryError;

/// Table: keys
/// Key: key id as big-endian bytes [8 bytes]
/// Value: CBOR-encoded StoredKey
const KEYS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("keys");

/// Table: meta
/// Key: metadata name
/// Value: counter value
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

/// Name of the id allocation counter in the META table.
const NEXT_ID: &str = "next_id";

/// First id handed out by a fresh database.
const FIRST_ID: KeyId = 1;

/// Durable key store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbKeyStore {
    db: Arc<Database>,
}

impl RedbKeyStore {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates tables if they don't exist (KEYS, META).
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Io` if the database cannot be opened or
    /// created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let db = Database::create(path.as_ref()).map_err(|e| RegistryError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| RegistryError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(KEYS).map_err(|e| RegistryError::Io(e.to_string()))?;
            let _ = txn.open_table(META).map_err(|e| RegistryError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| RegistryError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Find the key for a peer by scanning the KEYS table.
    fn scan_for_address<T: ReadableTable<&'static [u8], &'static [u8]>>(
        table: &T,
        peer_address: &str,
    ) -> Result<Option<(KeyId, StoredKey)>, RegistryError> {
        for result in table.iter().map_err(|e| RegistryError::Io(e.to_string()))? {
            let (key, value) = result.map_err(|e| RegistryError::Io(e.to_string()))?;
            let stored = decode_stored_key(value.value())?;

            if stored.peer_address == peer_address {
                return Ok(Some((decode_key_id(key.value())?, stored)));
            }
        }

        Ok(None)
    }
}

impl KeyStore for RedbKeyStore {
    fn upsert_key(&self, key: &StoredKey) -> Result<KeyId, RegistryError> {
        let txn = self.db.begin_write().map_err(|e| RegistryError::Io(e.to_string()))?;

        let id = {
            let mut keys = txn.open_table(KEYS).map_err(|e| RegistryError::Io(e.to_string()))?;
            let mut meta = txn.open_table(META).map_err(|e| RegistryError::Io(e.to_string()))?;

            let id = match Self::scan_for_address(&keys, &key.peer_address)? {
                Some((existing, _)) => existing,
                None => {
                    let next = meta
                        .get(NEXT_ID)
                        .map_err(|e| RegistryError::Io(e.to_string()))?
                        .map_or(FIRST_ID, |guard| guard.value());

                    meta.insert(NEXT_ID, next + 1).map_err(|e| RegistryError::Io(e.to_string()))?;
                    next
                },
            };

            let bytes = encode_stored_key(key)?;
            keys.insert(encode_key_id(id).as_slice(), bytes.as_slice())
                .map_err(|e| RegistryError::Io(e.to_string()))?;

            id
        };

        txn.commit().map_err(|e| RegistryError::Io(e.to_string()))?;

        Ok(id)
    }

    fn load_keys(&self) -> Result<BTreeMap<KeyId, StoredKey>, RegistryError> {
        let txn = self.db.begin_read().map_err(|e| RegistryError::Io(e.to_string()))?;

        let table = txn.open_table(KEYS).map_err(|e| RegistryError::Io(e.to_string()))?;

        let mut keys = BTreeMap::new();

        for result in table.iter().map_err(|e| RegistryError::Io(e.to_string()))? {
            let (key, value) = result.map_err(|e| RegistryError::Io(e.to_string()))?;
            keys.insert(decode_key_id(key.value())?, decode_stored_key(value.value())?);
        }

        Ok(keys)
    }

    fn find_by_address(
        &self,
        peer_address: &str,
    ) -> Result<Option<(KeyId, StoredKey)>, RegistryError> {
        let txn = self.db.begin_read().map_err(|e| RegistryError::Io(e.to_string()))?;

        let table = txn.open_table(KEYS).map_err(|e| RegistryError::Io(e.to_string()))?;

        Self::scan_for_address(&table, peer_address)
    }

    fn remove_key(&self, id: KeyId) -> Result<bool, RegistryError> {
        let txn = self.db.begin_write().map_err(|e| RegistryError::Io(e.to_string()))?;

        let removed = {
            let mut table = txn.open_table(KEYS).map_err(|e| RegistryError::Io(e.to_string()))?;

            let key = encode_key_id(id);
            table.remove(key.as_slice()).map_err(|e| RegistryError::Io(e.to_string()))?.is_some()
        };

        txn.commit().map_err(|e| RegistryError::Io(e.to_string()))?;

        Ok(removed)
    }
}

/// Encode key id as 8-byte big-endian key.
///
/// Big-endian keeps lexicographic table order equal to numeric id order.
fn encode_key_id(id: KeyId) -> [u8; 8] {
    id.to_be_bytes()
}

/// Decode an 8-byte big-endian key back to a key id.
fn decode_key_id(key: &[u8]) -> Result<KeyId, RegistryError> {
    <[u8; 8]>::try_from(key)
        .map(KeyId::from_be_bytes)
        .map_err(|_| {
            RegistryError::Serialization(format!("key id must be 8 bytes, got {}", key.len()))
        })
}

fn encode_stored_key(key: &StoredKey) -> Result<Vec<u8>, RegistryError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(key, &mut bytes)
        .map_err(|e| RegistryError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode_stored_key(bytes: &[u8]) -> Result<StoredKey, RegistryError> {
    ciborium::from_reader(bytes).map_err(|e| RegistryError::Serialization(e.to_string()))
}

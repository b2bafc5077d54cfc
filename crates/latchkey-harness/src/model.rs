//! Reference model of the key registry.
//!
//! The model is the obvious implementation: a sorted map plus an id counter,
//! no storage and no error paths. [`check_against_model`] replays operations
//! against both and reports the first divergence.

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use latchkey_registry::{KeyId, KeyRegistry, KeyStore, RegistryError};

/// Number of distinct peers operations draw from. Small so that re-accepts
/// and deletes of live ids are common.
const PEER_SPACE: u8 = 8;

/// Operation applied to both the model and a real registry.
#[derive(Debug, Clone, Arbitrary)]
pub enum RegistryOp {
    /// Accept `material` for peer number `peer`
    Insert {
        /// Peer number, folded into a small address space
        peer: u8,
        /// Key material
        material: Vec<u8>,
    },
    /// Delete the key with id `id`, present or not
    Delete {
        /// Id to delete
        id: u8,
    },
}

impl RegistryOp {
    /// Address used for peer number `peer`.
    pub fn address(peer: u8) -> String {
        format!("+1555000{:04}", peer % PEER_SPACE)
    }
}

/// Reference registry: id -> (address, material).
#[derive(Debug, Clone)]
pub struct RegistryModel {
    keys: BTreeMap<KeyId, (String, Vec<u8>)>,
    next_id: KeyId,
}

impl Default for RegistryModel {
    fn default() -> Self {
        Self { keys: BTreeMap::new(), next_id: 1 }
    }
}

impl RegistryModel {
    /// Empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a key, keeping the id of an existing key for the same address.
    pub fn insert(&mut self, address: &str, material: &[u8]) -> KeyId {
        let existing = self.keys.iter().find(|(_, (a, _))| a == address).map(|(id, _)| *id);

        let id = existing.unwrap_or_else(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        });

        self.keys.insert(id, (address.to_string(), material.to_vec()));
        id
    }

    /// Delete `id` if present.
    pub fn delete(&mut self, id: KeyId) {
        self.keys.remove(&id);
    }

    /// Listing in the shape `KeyRegistry::list` returns.
    pub fn list(&self) -> BTreeMap<KeyId, String> {
        self.keys.iter().map(|(id, (address, _))| (*id, address.clone())).collect()
    }

    /// Material accepted for `address`.
    pub fn key_material(&self, address: &str) -> Option<&[u8]> {
        self.keys.values().find(|(a, _)| a == address).map(|(_, material)| material.as_slice())
    }
}

/// First point where a registry and the model disagreed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Divergence {
    /// Registry returned an error the model cannot produce
    Registry {
        /// Index of the failing operation
        step: usize,
        /// Error returned by the registry
        error: RegistryError,
    },
    /// Registry state differs from the model after an operation
    State {
        /// Index of the operation after which states differ
        step: usize,
        /// Registry listing
        actual: BTreeMap<KeyId, String>,
        /// Model listing
        expected: BTreeMap<KeyId, String>,
    },
}

/// Replay `ops` against `registry` and a fresh model.
///
/// The registry must start empty. Checks the listing after every operation
/// and the stored material of every peer at the end.
pub fn check_against_model<S: KeyStore>(
    registry: &KeyRegistry<S>,
    ops: &[RegistryOp],
) -> Result<(), Divergence> {
    let mut model = RegistryModel::new();

    for (step, op) in ops.iter().enumerate() {
        let registry_error = |error| Divergence::Registry { step, error };

        match op {
            RegistryOp::Insert { peer, material } => {
                let address = RegistryOp::address(*peer);
                let actual = registry.insert(&address, material, 0).map_err(registry_error)?;
                let expected = model.insert(&address, material);

                if actual != expected {
                    return Err(Divergence::State {
                        step,
                        actual: [(actual, address.clone())].into(),
                        expected: [(expected, address)].into(),
                    });
                }
            },
            RegistryOp::Delete { id } => {
                registry.delete(KeyId::from(*id)).map_err(registry_error)?;
                model.delete(KeyId::from(*id));
            },
        }

        let actual = registry.list().map_err(registry_error)?;
        let expected = model.list();
        if actual != expected {
            return Err(Divergence::State { step, actual, expected });
        }
    }

    for peer in 0..PEER_SPACE {
        let address = RegistryOp::address(peer);
        let step = ops.len();
        let actual = registry
            .key_material(&address)
            .map_err(|error| Divergence::Registry { step, error })?;

        if actual.as_deref() != model.key_material(&address) {
            let actual = registry.list().map_err(|error| Divergence::Registry { step, error })?;
            return Err(Divergence::State { step, actual, expected: model.list() });
        }
    }

    Ok(())
}

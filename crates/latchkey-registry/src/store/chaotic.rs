//! Fault-injecting key store.
//!
//! Used by the chaos tests and fuzzers to check that a failed registry
//! mutation leaves the store as it was.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use super::{KeyId, KeyStore, StoredKey};
use crate::RegistryError;

/// Key store wrapper that fails a seeded fraction of calls.
///
/// Every call first draws from a seeded generator; on a hit it returns
/// `RegistryError::Io` without touching the inner store. Clones share the
/// generator and the failure counter.
#[derive(Clone)]
pub struct ChaoticKeyStore<S: KeyStore> {
    inner: S,
    failure_rate: f64,
    faults: Arc<Mutex<FaultSource>>,
}

/// Seeded fault source.
struct FaultSource {
    /// splitmix64 state
    state: u64,
    injected: usize,
}

impl FaultSource {
    /// Uniform draw in [0, 1) from the top 53 bits of the next output.
    fn draw(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;

        (z >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl<S: KeyStore> ChaoticKeyStore<S> {
    /// Wrap `inner`, failing roughly `failure_rate` of all calls.
    ///
    /// # Panics
    ///
    /// If `failure_rate` is outside [0.0, 1.0].
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x6C61_7463_686B_6579)
    }

    /// Like [`ChaoticKeyStore::new`] with an explicit seed. Equal seeds
    /// fail the same calls.
    ///
    /// # Panics
    ///
    /// If `failure_rate` is outside [0.0, 1.0].
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "chaos failure rate {failure_rate} outside [0.0, 1.0]"
        );

        Self {
            inner,
            failure_rate,
            faults: Arc::new(Mutex::new(FaultSource { state: seed, injected: 0 })),
        }
    }

    /// Wrapped store, for checking state after injected failures.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of failures injected so far.
    pub fn injected_failures(&self) -> usize {
        #[allow(clippy::expect_used)]
        self.faults.lock().expect("Mutex poisoned").injected
    }

    fn maybe_fail(&self, operation: &str) -> Result<(), RegistryError> {
        #[allow(clippy::expect_used)]
        let mut faults = self.faults.lock().expect("Mutex poisoned");

        if faults.draw() >= self.failure_rate {
            return Ok(());
        }

        faults.injected += 1;
        tracing::warn!(operation, injected = faults.injected, "injected key store failure");
        Err(RegistryError::Io(format!("injected failure in {operation}")))
    }
}

impl<S: KeyStore> KeyStore for ChaoticKeyStore<S> {
    fn upsert_key(&self, key: &StoredKey) -> Result<KeyId, RegistryError> {
        self.maybe_fail("upsert_key")?;
        self.inner.upsert_key(key)
    }

    fn load_keys(&self) -> Result<BTreeMap<KeyId, StoredKey>, RegistryError> {
        self.maybe_fail("load_keys")?;
        self.inner.load_keys()
    }

    fn find_by_address(
        &self,
        peer_address: &str,
    ) -> Result<Option<(KeyId, StoredKey)>, RegistryError> {
        self.maybe_fail("find_by_address")?;
        self.inner.find_by_address(peer_address)
    }

    fn remove_key(&self, id: KeyId) -> Result<bool, RegistryError> {
        self.maybe_fail("remove_key")?;
        self.inner.remove_key(id)
    }
}

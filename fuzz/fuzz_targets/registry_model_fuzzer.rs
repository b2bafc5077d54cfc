//! Fuzz target comparing the key registry against its reference model
//!
//! Applies arbitrary insert/delete sequences to a registry over the in-memory
//! store and to `RegistryModel`, checking listings after every step. A second
//! run wraps the store in `ChaoticKeyStore`: failed operations must leave the
//! inner store untouched.

#![no_main]

use arbitrary::Arbitrary;
use latchkey_harness::{RegistryOp, check_against_model};
use latchkey_registry::{ChaoticKeyStore, KeyRegistry, KeyStore, MemoryKeyStore};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Scenario {
    chaos_seed: u64,
    /// Failure rate 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    ops: Vec<RegistryOp>,
}

fuzz_target!(|scenario: Scenario| {
    let registry = KeyRegistry::new(MemoryKeyStore::new());
    if let Err(divergence) = check_against_model(&registry, &scenario.ops) {
        panic!("registry diverged from model: {divergence:?}");
    }

    let failure_rate = f64::from(scenario.failure_rate_tenth % 10) / 10.0;
    let chaotic =
        ChaoticKeyStore::with_seed(MemoryKeyStore::new(), failure_rate, scenario.chaos_seed);
    let registry = KeyRegistry::new(chaotic);

    for op in &scenario.ops {
        let before = registry.store().inner().load_keys().unwrap();

        let result = match op {
            RegistryOp::Insert { peer, material } => {
                registry.insert(&RegistryOp::address(*peer), material, 0).map(|_| ())
            },
            RegistryOp::Delete { id } => registry.delete(u64::from(*id)),
        };

        if result.is_err() {
            assert_eq!(registry.store().inner().load_keys().unwrap(), before);
        }
    }
});

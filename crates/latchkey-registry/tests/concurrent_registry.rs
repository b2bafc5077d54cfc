//! Concurrent readers and writers on one registry
//!
//! A writer thread repeatedly accepts and deletes a key while a reader thread
//! loops over `list()` and `entries()`. Every snapshot the reader sees must be
//! either the state before an insert or the state after it:
//! - The long-lived key is always present with its address
//! - At most one short-lived key is present, with its address
//! - Ids seen by the reader never go backwards

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use latchkey_registry::{KeyId, KeyRegistry, KeyStore, MemoryKeyStore, NoDirectory, RedbKeyStore};
use tempfile::tempdir;

const RESIDENT: &str = "+15551234567";
const VISITOR: &str = "+15557654321";

fn check_snapshot(
    snapshot: &BTreeMap<KeyId, String>,
    resident: KeyId,
    last_visitor: &mut KeyId,
) {
    assert_eq!(snapshot.get(&resident).map(String::as_str), Some(RESIDENT), "{snapshot:?}");

    let visitors: Vec<(&KeyId, &String)> =
        snapshot.iter().filter(|(id, _)| **id != resident).collect();

    match visitors.as_slice() {
        [] => {},
        [(id, address)] => {
            assert_eq!(address.as_str(), VISITOR, "{snapshot:?}");
            assert!(**id >= *last_visitor, "id went backwards: {snapshot:?}");
            *last_visitor = **id;
        },
        _ => panic!("more than one short-lived key listed: {snapshot:?}"),
    }
}

fn delete_while_listing<S: KeyStore>(registry: &KeyRegistry<S>, rounds: usize) {
    let resident = registry.insert(RESIDENT, b"resident", 0).unwrap();
    let done = AtomicBool::new(false);

    let snapshots = thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut seen = 0usize;
            let mut last_visitor = 0;

            loop {
                let finished = done.load(Ordering::Acquire);

                let listed = registry.list().unwrap();
                check_snapshot(&listed, resident, &mut last_visitor);

                let entries = registry.entries(&NoDirectory).unwrap();
                let as_map: BTreeMap<KeyId, String> =
                    entries.iter().map(|e| (e.id, e.peer_address.clone())).collect();
                assert_eq!(as_map.len(), entries.len());
                for entry in &entries {
                    assert!(!entry.peer_address.is_empty());
                    assert_eq!(entry.description, entry.peer_address);
                }
                check_snapshot(&as_map, resident, &mut last_visitor);

                seen += 1;
                if finished {
                    return seen;
                }
            }
        });

        for round in 0..rounds {
            let id = registry.insert(VISITOR, &[round as u8; 16], 0).unwrap();
            assert!(registry.list().unwrap().contains_key(&id));

            registry.delete(id).unwrap();
            assert!(!registry.list().unwrap().contains_key(&id));
        }

        done.store(true, Ordering::Release);
        reader.join().unwrap()
    });

    assert!(snapshots > 0);

    let remaining = registry.list().unwrap();
    assert_eq!(remaining, BTreeMap::from([(resident, RESIDENT.to_string())]));
}

#[test]
fn memory_delete_concurrent_with_list() {
    let registry = KeyRegistry::new(MemoryKeyStore::new());
    delete_while_listing(&registry, 2_000);
}

#[test]
fn redb_delete_concurrent_with_list() {
    let dir = tempdir().unwrap();
    let registry = KeyRegistry::new(RedbKeyStore::open(dir.path().join("keys.redb")).unwrap());
    delete_while_listing(&registry, 100);
}

#[test]
fn cloned_registries_share_a_consistent_view() {
    let registry = KeyRegistry::new(MemoryKeyStore::new());
    let writer = registry.clone();
    let resident = registry.insert(RESIDENT, b"resident", 0).unwrap();

    thread::scope(|scope| {
        scope.spawn(move || {
            for _ in 0..500 {
                let id = writer.insert(VISITOR, b"visitor", 0).unwrap();
                writer.delete(id).unwrap();
            }
        });

        let mut last_visitor = 0;
        for _ in 0..500 {
            check_snapshot(&registry.list().unwrap(), resident, &mut last_visitor);
        }
    });

    assert_eq!(registry.len().unwrap(), 1);
}

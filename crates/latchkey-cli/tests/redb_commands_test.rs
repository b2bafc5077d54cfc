//! Key management commands against an on-disk registry.
//!
//! Each command opens the database afresh, as separate invocations of the
//! binary would.

use latchkey_cli::{CliError, Command, Directory, parse_contact, run};
use latchkey_harness::SimEnv;
use latchkey_registry::{KeyRegistry, KeyStore, RedbKeyStore};
use tempfile::tempdir;

fn invoke(
    path: &std::path::Path,
    env: &SimEnv,
    contacts: &[&str],
    command: Command,
    stdin: &str,
) -> Result<String, CliError> {
    let directory: Directory =
        contacts.iter().map(|value| parse_contact(value)).collect::<Result<_, _>>()?;
    let registry = KeyRegistry::new(RedbKeyStore::open(path)?);

    let mut output = Vec::new();
    run(&registry, &directory, env, command, &mut stdin.as_bytes(), &mut output)?;
    Ok(String::from_utf8(output).unwrap())
}

#[test]
fn accept_list_delete_across_invocations() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys.redb");
    let env = SimEnv::new(1_000);

    let accept = |address: &str, key_hex: &str| Command::Accept {
        address: address.to_string(),
        key_hex: key_hex.to_string(),
    };

    invoke(&path, &env, &[], accept("+15551234567", "0a0b"), "").unwrap();
    env.advance(60);
    invoke(&path, &env, &[], accept("+15557654321", "0c0d"), "").unwrap();

    let listed = invoke(&path, &env, &["+15557654321=Bob"], Command::List, "").unwrap();
    assert_eq!(listed, "   1  +15551234567\n   2  Bob <+15557654321>\n");

    let deleted = invoke(&path, &env, &[], Command::Delete { id: 1, yes: false }, "y\n").unwrap();
    assert!(deleted.ends_with("Deleted key 1\n"));

    let store = RedbKeyStore::open(&path).unwrap();
    let keys = store.load_keys().unwrap();
    assert_eq!(keys.keys().copied().collect::<Vec<_>>(), vec![2]);
    assert_eq!(keys[&2].accepted_at_secs, 1_060);
    assert_eq!(keys[&2].key_material, vec![0x0c, 0x0d]);
}

#[test]
fn deleted_ids_are_not_reused() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys.redb");
    let env = SimEnv::default();

    let accept = Command::Accept { address: "alice".to_string(), key_hex: "01".to_string() };
    invoke(&path, &env, &[], accept, "").unwrap();
    invoke(&path, &env, &[], Command::Delete { id: 1, yes: true }, "").unwrap();

    assert_eq!(invoke(&path, &env, &[], Command::List, "").unwrap(), "No accepted public keys\n");

    let accept = Command::Accept { address: "alice".to_string(), key_hex: "02".to_string() };
    let output = invoke(&path, &env, &[], accept, "").unwrap();
    assert_eq!(output, "Accepted key 2 for alice\n");
}

#[test]
fn invalid_contact_is_reported_before_opening_the_database() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys.redb");

    let result = invoke(&path, &SimEnv::default(), &["no-separator"], Command::List, "");

    assert!(matches!(result, Err(CliError::InvalidContact { .. })));
    assert!(!path.exists());
}

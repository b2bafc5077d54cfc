//! Display labels for registry entries.
//!
//! Identity resolution is a best-effort capability: a resolver may know a
//! contact name for an address or it may not. Labels are computed on every
//! listing and never written back to the store.

use std::collections::HashMap;

/// Resolves a peer address to a human-readable contact name.
///
/// Used only for presentation, never for matching keys to peers.
pub trait IdentityResolver {
    /// Display name for `address`, or `None` if the contact is unknown.
    fn resolve_display_name(&self, address: &str) -> Option<String>;
}

/// Resolver that knows no contacts. Every label is the raw address.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDirectory;

impl IdentityResolver for NoDirectory {
    fn resolve_display_name(&self, _address: &str) -> Option<String> {
        None
    }
}

impl IdentityResolver for HashMap<String, String> {
    fn resolve_display_name(&self, address: &str) -> Option<String> {
        self.get(address).cloned()
    }
}

impl<R: IdentityResolver + ?Sized> IdentityResolver for &R {
    fn resolve_display_name(&self, address: &str) -> Option<String> {
        (**self).resolve_display_name(address)
    }
}

/// Label shown for `address`.
///
/// `"{name} <{address}>"` when the resolver yields a non-blank name that
/// differs from the address, otherwise the address unchanged.
pub fn display_label<R: IdentityResolver + ?Sized>(address: &str, resolver: &R) -> String {
    match resolver.resolve_display_name(address) {
        Some(name) if !name.trim().is_empty() && name != address => {
            format!("{name} <{address}>")
        },
        _ => address.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> HashMap<String, String> {
        let mut contacts = HashMap::new();
        contacts.insert("+15551234567".to_string(), "Alice".to_string());
        contacts.insert("+15550000000".to_string(), "+15550000000".to_string());
        contacts.insert("+15559999999".to_string(), "   ".to_string());
        contacts
    }

    #[test]
    fn known_contact_gets_name_and_address() {
        assert_eq!(display_label("+15551234567", &directory()), "Alice <+15551234567>");
    }

    #[test]
    fn unknown_contact_falls_back_to_address() {
        assert_eq!(display_label("+15557654321", &directory()), "+15557654321");
        assert_eq!(display_label("+15557654321", &NoDirectory), "+15557654321");
    }

    #[test]
    fn name_equal_to_address_is_not_repeated() {
        assert_eq!(display_label("+15550000000", &directory()), "+15550000000");
    }

    #[test]
    fn blank_name_falls_back_to_address() {
        assert_eq!(display_label("+15559999999", &directory()), "+15559999999");
    }

    #[test]
    fn labelling_is_idempotent() {
        let contacts = directory();
        let first = display_label("+15551234567", &contacts);
        let second = display_label("+15551234567", &contacts);
        assert_eq!(first, second);
    }
}

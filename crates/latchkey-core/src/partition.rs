//! Recipient partitioning.
//!
//! Splits an outgoing recipient list into peers with an accepted key
//! (delivered encrypted) and peers without (delivered plain). The plan is
//! shown to the user with everyone selected; deselecting a recipient drops
//! them from the send entirely and never switches their delivery mode.

use std::{
    collections::HashSet,
    hash::{Hash, Hasher},
};

use latchkey_registry::{IdentityResolver, KeyRegistry, KeyStore, RegistryError, display_label};

/// Outgoing recipient.
///
/// Equality and hashing consider only the address.
#[derive(Debug, Clone)]
pub struct Recipient {
    /// Peer address
    pub address: String,
    /// Contact name, if the caller resolved one
    pub display_name: Option<String>,
}

impl Recipient {
    /// Recipient known only by address.
    pub fn new(address: impl Into<String>) -> Self {
        Self { address: address.into(), display_name: None }
    }

    /// Recipient with a resolved contact name.
    pub fn named(address: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { address: address.into(), display_name: Some(display_name.into()) }
    }

    /// Label shown in the confirmation prompt.
    pub fn label(&self) -> String {
        display_label(&self.address, self)
    }
}

impl IdentityResolver for Recipient {
    fn resolve_display_name(&self, address: &str) -> Option<String> {
        if address == self.address { self.display_name.clone() } else { None }
    }
}

impl PartialEq for Recipient {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Recipient {}

impl Hash for Recipient {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

/// Outgoing recipients split by delivery mode.
///
/// # Invariants
///
/// - No address appears twice across both groups
/// - Each group keeps the relative order of the input list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientPlan {
    /// Recipients with an accepted key, delivered encrypted
    pub keyed: Vec<Recipient>,
    /// Recipients without a key, delivered plain
    pub unkeyed: Vec<Recipient>,
}

impl RecipientPlan {
    /// True when there is nobody to send to.
    pub fn is_empty(&self) -> bool {
        self.keyed.is_empty() && self.unkeyed.is_empty()
    }

    /// Total number of recipients.
    pub fn len(&self) -> usize {
        self.keyed.len() + self.unkeyed.len()
    }

    /// Every recipient, keyed group first.
    pub fn recipients(&self) -> impl Iterator<Item = &Recipient> {
        self.keyed.iter().chain(self.unkeyed.iter())
    }
}

/// User's answer to the confirmation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Send to everyone except the deselected recipients
    Send {
        /// Recipients the user unchecked
        deselected: HashSet<Recipient>,
    },
    /// Abort the send
    Cancel,
}

impl Confirmation {
    /// Send to everyone in the plan.
    pub fn send_all() -> Self {
        Self::Send { deselected: HashSet::new() }
    }
}

/// Split `recipients` by whether the registry holds a key for them.
///
/// Duplicate addresses collapse to their first occurrence. An empty list
/// yields an empty plan, which the caller must not send.
///
/// # Errors
///
/// - `RegistryError` if the registry cannot be read
pub fn partition<S: KeyStore>(
    recipients: &[Recipient],
    registry: &KeyRegistry<S>,
) -> Result<RecipientPlan, RegistryError> {
    let mut plan = RecipientPlan::default();
    let mut seen = HashSet::new();

    for recipient in recipients {
        if !seen.insert(recipient.address.as_str()) {
            tracing::debug!(address = %recipient.address, "duplicate recipient collapsed");
            continue;
        }

        if registry.has_key(&recipient.address)? {
            plan.keyed.push(recipient.clone());
        } else {
            plan.unkeyed.push(recipient.clone());
        }
    }

    tracing::debug!(
        keyed = plan.keyed.len(),
        unkeyed = plan.unkeyed.len(),
        "partitioned recipients"
    );

    Ok(plan)
}

/// Drop every deselected recipient from the plan.
pub fn apply_override(plan: &RecipientPlan, deselected: &HashSet<Recipient>) -> RecipientPlan {
    let keep = |recipients: &[Recipient]| -> Vec<Recipient> {
        recipients.iter().filter(|r| !deselected.contains(*r)).cloned().collect()
    };

    RecipientPlan { keyed: keep(&plan.keyed), unkeyed: keep(&plan.unkeyed) }
}

/// Final plan after the user answered the prompt. `None` when cancelled.
pub fn confirm(plan: &RecipientPlan, confirmation: &Confirmation) -> Option<RecipientPlan> {
    match confirmation {
        Confirmation::Send { deselected } => Some(apply_override(plan, deselected)),
        Confirmation::Cancel => None,
    }
}

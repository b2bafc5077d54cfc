//! Control plane errors.

use latchkey_core::HandshakeError;
use latchkey_registry::RegistryError;
use thiserror::Error;

/// Errors returned from [`ControlPlane::handle`](crate::ControlPlane::handle).
///
/// Per-message failures never surface here; they are folded into
/// [`ControlAction::Display`](crate::ControlAction::Display) outcomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Key registry storage failed
    #[error("key registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Handshake outcome reported in the wrong state
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),
}

impl ClientError {
    /// Returns true if retrying the same event may succeed.
    ///
    /// Storage I/O can be transient. Corrupt records and out-of-order
    /// handshake reports are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Registry(RegistryError::Io(_)))
    }
}

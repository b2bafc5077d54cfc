//! Error types for the control plane core.
//!
//! Per-message failures ([`ClassifyError`], [`MessageError`]) are recovered by
//! the caller and never abort a batch. [`HandshakeError`] signals a driver
//! reporting a transition the state machine is not in a position to take.

use thiserror::Error;

use crate::{crypto::DecryptError, handshake::HandshakeState};

/// Errors from decoding and decrypting an encrypted body.
///
/// Both variants are handled the same way: logged, raw body shown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    /// Marker present but the payload after it is not valid base64
    #[error("malformed encrypted payload: {reason}")]
    MalformedHeader {
        /// Why the payload could not be decoded
        reason: String,
    },

    /// Crypto capability rejected the ciphertext
    #[error(transparent)]
    Decrypt(#[from] DecryptError),
}

/// Errors from building an [`InboundMessage`](crate::InboundMessage).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// Transport type tag is neither `sms` nor `mms`
    #[error("unknown message kind: {kind:?}")]
    UnknownMessageKind {
        /// Type tag as reported by the transport
        kind: String,
    },
}

/// Errors from handshake state transitions.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeError {
    /// Requested transition is not allowed from the current state
    #[error("invalid handshake transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// State the controller was in
        from: HandshakeState,
        /// State the caller asked for
        to: HandshakeState,
    },
}

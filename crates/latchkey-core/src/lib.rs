//! Latchkey core
//!
//! Pure decision logic of the secure-messaging control plane. Nothing in this
//! crate performs I/O on its own: key lookups go through the
//! [`latchkey_registry::KeyRegistry`], cryptography through the
//! [`CryptoCapability`] the caller provides.
//!
//! # Components
//!
//! - [`marker`]: header marker constants and body classification
//! - [`HandshakeController`]: single-flight authentication state machine
//! - [`MessageClassifier`]: inbound classify, decrypt or handshake pipeline
//! - [`partition()`]: keyed/unkeyed split of an outgoing recipient list
//! - [`FormattedCache`]: presentation cache keyed by message id
//! - [`Environment`]: wall clock abstraction

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cache;
pub mod classifier;
pub mod crypto;
pub mod env;
pub mod error;
pub mod handshake;
pub mod marker;
pub mod message;
pub mod partition;

pub use cache::FormattedCache;
pub use classifier::{
    BatchEntry, ClassifiedMessage, ClassifierConfig, DecryptionOutcome, MessageClassifier,
};
pub use crypto::{CryptoCapability, DecryptError};
pub use env::{Environment, SystemEnv};
pub use error::{ClassifyError, HandshakeError, MessageError};
pub use handshake::{HandshakeController, HandshakeState};
pub use marker::{
    ENCRYPTED_MARKER, MessageHeaderTag, PUBLIC_KEY_MARKER, classify, decode_encrypted_body,
    encode_encrypted_body, strip_marker,
};
pub use message::{
    DeliveryStatus, InboundMessage, MessageBox, MessageId, RawMessage, TransportKind,
};
pub use partition::{Confirmation, Recipient, RecipientPlan, apply_override, confirm, partition};

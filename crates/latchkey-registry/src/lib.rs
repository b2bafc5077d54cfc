//! Key registry
//!
//! Durable set of peer public keys the user has accepted, independent of any
//! single conversation. The registry maps a numeric [`KeyId`] to the peer
//! address the key belongs to and the opaque key material itself.
//!
//! # Architecture
//!
//! Persistence sits behind the synchronous [`KeyStore`] trait so the same
//! registry logic runs against an in-memory map in tests and a redb file in
//! production. [`KeyRegistry`] layers the user-facing operations on top:
//! listing, atomic deletion, key presence checks and display labelling.
//!
//! # Components
//!
//! - [`KeyRegistry`]: list/delete/has-key operations over any store
//! - [`KeyStore`]: storage abstraction
//! - [`MemoryKeyStore`], [`RedbKeyStore`]: storage backends
//! - [`ChaoticKeyStore`]: fault-injecting wrapper for chaos tests
//! - [`IdentityResolver`]: display-name lookup used only for presentation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod display;
mod error;
mod registry;
pub mod store;

pub use display::{IdentityResolver, NoDirectory, display_label};
pub use error::RegistryError;
pub use registry::{KeyEntry, KeyListing, KeyRegistry};
pub use store::{ChaoticKeyStore, KeyId, KeyStore, MemoryKeyStore, RedbKeyStore, StoredKey};

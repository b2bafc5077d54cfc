//! Deterministic simulation harness for Latchkey testing.
//!
//! Seeded stand-ins for the collaborators the control plane consumes, so
//! tests and fuzz targets run the real classifier, partitioner and registry
//! without a phone stack or key store on disk.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation of the key
//! registry. Operations are applied to both the model and a real registry,
//! and their listings are compared.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod model;
pub mod sim_crypto;
pub mod sim_env;

pub use model::{Divergence, RegistryModel, RegistryOp, check_against_model};
pub use sim_crypto::SimCrypto;
pub use sim_env::SimEnv;

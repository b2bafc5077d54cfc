//! Registry error types.
//!
//! The registry never reports "not found": deleting an absent id or looking
//! up an unknown address are ordinary outcomes. Errors only describe the
//! underlying store:
//! - `Serialization`: a stored record could not be encoded or decoded
//! - `Io`: the storage system is unavailable

use thiserror::Error;

/// Errors that can occur during key registry operations.
///
/// A failed mutation leaves the registry unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Serialization or deserialization of a stored key failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io(err.to_string())
    }
}

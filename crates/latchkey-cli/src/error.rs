//! CLI error types.

use latchkey_registry::{KeyId, RegistryError};
use thiserror::Error;

/// Errors reported by the key management commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// Key registry storage failed
    #[error("key registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Reading the confirmation or writing output failed
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key material was not valid hex
    #[error("invalid key material: {0}")]
    InvalidKeyHex(#[from] hex::FromHexError),

    /// Key material decoded to zero bytes
    #[error("key material is empty")]
    EmptyKey,

    /// No key is stored under this id
    #[error("no accepted key with id {id}")]
    UnknownKey {
        /// Requested id
        id: KeyId,
    },

    /// `--contact` value was not `ADDRESS=NAME`
    #[error("invalid contact {value:?}: expected ADDRESS=NAME")]
    InvalidContact {
        /// Value as given on the command line
        value: String,
    },
}

//! Key management commands
//!
//! Library half of the `latchkey-keys` binary. Commands run against any
//! [`KeyRegistry`](latchkey_registry::KeyRegistry) and write to any
//! [`std::io::Write`], so they are tested without a terminal or a database
//! file.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod contacts;
mod error;

pub use command::{Command, run};
pub use contacts::{Directory, parse_contact};
pub use error::CliError;

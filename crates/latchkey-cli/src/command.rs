//! Key management subcommands.

use std::io::{BufRead, Write};

use clap::Subcommand;
use latchkey_core::Environment;
use latchkey_registry::{IdentityResolver, KeyId, KeyListing, KeyRegistry, KeyStore};

use crate::error::CliError;

/// Subcommands of `latchkey-keys`.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List accepted public keys
    List,

    /// Delete an accepted public key
    Delete {
        /// Id shown by `list`
        id: KeyId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Accept a public key for a peer
    Accept {
        /// Peer address the key belongs to
        address: String,

        /// Key material as hex
        key_hex: String,
    },
}

/// Execute `command` against `registry`.
///
/// `input` is read only by `delete` without `--yes`, for the confirmation.
pub fn run<S, R, E>(
    registry: &KeyRegistry<S>,
    resolver: &R,
    env: &E,
    command: Command,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<(), CliError>
where
    S: KeyStore,
    R: IdentityResolver,
    E: Environment,
{
    match command {
        Command::List => list(registry, resolver, output),
        Command::Delete { id, yes } => delete(registry, resolver, id, yes, input, output),
        Command::Accept { address, key_hex } => {
            let key_material = hex::decode(key_hex.trim())?;
            if key_material.is_empty() {
                return Err(CliError::EmptyKey);
            }

            let id = registry.insert(&address, &key_material, env.wall_clock_secs())?;
            writeln!(output, "Accepted key {id} for {address}")?;
            Ok(())
        },
    }
}

fn list<S: KeyStore, R: IdentityResolver>(
    registry: &KeyRegistry<S>,
    resolver: &R,
    output: &mut impl Write,
) -> Result<(), CliError> {
    match registry.listing(resolver)? {
        KeyListing::Empty => writeln!(output, "No accepted public keys")?,
        KeyListing::Keys(entries) => {
            for entry in entries {
                writeln!(output, "{:>4}  {}", entry.id, entry.description)?;
            }
        },
    }

    Ok(())
}

fn delete<S: KeyStore, R: IdentityResolver>(
    registry: &KeyRegistry<S>,
    resolver: &R,
    id: KeyId,
    yes: bool,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<(), CliError> {
    let Some(entry) = registry.entries(resolver)?.into_iter().find(|entry| entry.id == id) else {
        return Err(CliError::UnknownKey { id });
    };

    if !yes {
        write!(output, "Delete public key of {}? [y/N] ", entry.description)?;
        output.flush()?;

        let mut answer = String::new();
        input.read_line(&mut answer)?;

        if !is_affirmative(&answer) {
            tracing::debug!(id, "deletion aborted");
            writeln!(output, "Aborted")?;
            return Ok(());
        }
    }

    registry.delete(id)?;
    writeln!(output, "Deleted key {id}")?;
    Ok(())
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

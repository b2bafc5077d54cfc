//! Latchkey key management binary.
//!
//! # Usage
//!
//! ```bash
//! # List accepted keys, labelling a known contact
//! latchkey-keys --contact +15551234567=Alice list
//!
//! # Accept a key announced by a peer
//! latchkey-keys accept +15551234567 3f9a0c
//!
//! # Delete without the confirmation prompt
//! latchkey-keys --db keys.redb delete 1 --yes
//! ```

use std::{io, path::PathBuf};

use clap::Parser;
use latchkey_cli::{Command, Directory, parse_contact, run};
use latchkey_core::SystemEnv;
use latchkey_registry::{KeyRegistry, RedbKeyStore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Latchkey key management
#[derive(Parser, Debug)]
#[command(name = "latchkey-keys")]
#[command(about = "Manage accepted peer public keys")]
#[command(version)]
struct Args {
    /// Path to the key database
    #[arg(long, default_value = "latchkey-keys.redb")]
    db: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Contact shown by name, as ADDRESS=NAME (repeatable)
    #[arg(long = "contact", value_name = "ADDRESS=NAME")]
    contacts: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let directory =
        args.contacts.iter().map(|value| parse_contact(value)).collect::<Result<Directory, _>>()?;

    tracing::debug!(db = %args.db.display(), contacts = directory.len(), "opening key database");

    let registry = KeyRegistry::new(RedbKeyStore::open(&args.db)?);

    run(
        &registry,
        &directory,
        &SystemEnv::new(),
        args.command,
        &mut io::stdin().lock(),
        &mut io::stdout().lock(),
    )?;

    Ok(())
}

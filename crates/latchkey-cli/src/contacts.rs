//! Contact directory seeded from the command line.

use std::collections::HashMap;

use crate::error::CliError;

/// Address to display name, as given by repeated `--contact` flags.
pub type Directory = HashMap<String, String>;

/// Parse one `ADDRESS=NAME` pair.
///
/// Splits on the first `=`, so names may contain `=`. The address must not be
/// blank; a blank name is kept and later falls back to the address when
/// labelled.
pub fn parse_contact(value: &str) -> Result<(String, String), CliError> {
    let Some((address, name)) = value.split_once('=') else {
        return Err(CliError::InvalidContact { value: value.to_string() });
    };

    let address = address.trim();
    if address.is_empty() {
        return Err(CliError::InvalidContact { value: value.to_string() });
    }

    Ok((address.to_string(), name.trim().to_string()))
}

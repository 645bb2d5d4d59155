//! Operator side: turn a sealed line copied out of a job log back into usable
//! credentials.

use clap::ValueEnum;
use zeroize::Zeroizing;

use crate::credentials::{RuntimeCredentials, VariableNames};
use crate::crypto::sealing::{open, Identity, SealedCredentials};
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RevealFormat {
    /// The record as sealed, pretty-printed.
    Json,
    /// `{"cache_url", "runtime_token"}` credentials file for a cache client.
    Cache,
    /// Shell `export` lines.
    Env,
}

pub fn reveal(identity: &Identity, sealed_text: &str) -> Result<RuntimeCredentials> {
    let ciphertext = SealedCredentials::decode(sealed_text)?;
    let plaintext = open(identity, &ciphertext)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Renders `credentials` in `format`. The output always ends with a newline.
pub fn render(
    credentials: &RuntimeCredentials,
    format: RevealFormat,
    names: &VariableNames,
) -> Result<Zeroizing<String>> {
    let mut text = match format {
        RevealFormat::Json => {
            serde_json::to_string_pretty(credentials).map_err(Error::RecordEncoding)?
        }
        RevealFormat::Cache => serde_json::to_string_pretty(&credentials.cache_daemon_view())
            .map_err(Error::RecordEncoding)?,
        RevealFormat::Env => credentials
            .named_values(names)
            .iter()
            .map(|(name, value)| format!("export {name}={}", shell_quote(value)))
            .collect::<Vec<_>>()
            .join("\n"),
    };
    text.push('\n');
    Ok(Zeroizing::new(text))
}

/// POSIX single-quoting: `'` becomes `'\''`.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

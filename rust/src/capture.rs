//! Capture pipeline: check the recipient, assemble the credential record from
//! the environment, seal it, and emit the sealed line.

use std::io::Write;

use zeroize::Zeroizing;

use crate::config::FileConfig;
use crate::credentials::{RuntimeCredentials, VariableNames};
use crate::crypto::sealing::{seal, Recipient, SealedCredentials};
use crate::environment::Environment;
use crate::error::{Error, Result};

/// Environment variable the recipient public key is read from.
pub const RECIPIENT_ENV: &str = "AGE_PUBLIC_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub recipient: Option<String>,
    pub variables: VariableNames,
}

impl CaptureRequest {
    /// Merges a command-line (or environment) recipient with the config
    /// file. A blank command-line value counts as absent.
    pub fn resolve(cli_recipient: Option<String>, file: Option<&FileConfig>) -> Self {
        let recipient = cli_recipient
            .filter(|value| !value.trim().is_empty())
            .or_else(|| file.and_then(|f| f.recipient.clone()));
        let variables = file.map(|f| f.variables.clone()).unwrap_or_default();
        Self {
            recipient,
            variables,
        }
    }
}

/// Seals the runtime credentials found in `env` to the requested recipient.
/// The recipient is validated before anything is read or encrypted.
pub fn capture(env: &impl Environment, request: &CaptureRequest) -> Result<SealedCredentials> {
    let recipient = Recipient::parse(
        request.recipient.as_deref().unwrap_or_default(),
        RECIPIENT_ENV,
    )?;

    let credentials = RuntimeCredentials::from_environment(env, &request.variables);
    let record =
        Zeroizing::new(serde_json::to_vec(&credentials).map_err(Error::RecordEncoding)?);
    let sealed = seal(&recipient, &record)?;

    tracing::info!(
        recipient = %recipient.fingerprint(),
        sealed_len = sealed.as_str().len(),
        "sealed runtime credentials"
    );
    Ok(sealed)
}

/// Writes the sealed line and flushes so it reaches the log before holding.
pub fn emit(out: &mut impl Write, sealed: &SealedCredentials) -> Result<()> {
    writeln!(out, "{sealed}").map_err(|e| Error::Io(e, "writing sealed credentials".into()))?;
    out.flush()
        .map_err(|e| Error::Io(e, "flushing sealed credentials".into()))
}

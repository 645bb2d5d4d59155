//! Recipient-keyed sealing built on age X25519.
//! A credential record is encrypted to exactly one public key and carried as a
//! single line of padded base64 so it survives CI log output intact.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

use age::secrecy::ExposeSecret;
use age::x25519;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use zeroize::Zeroizing;

use crate::crypto::integrity::fingerprint;
use crate::error::{Error, Result};

const SECRET_KEY_PREFIX: &str = "AGE-SECRET-KEY-";

/// Public key a record is sealed to.
#[derive(Clone)]
pub struct Recipient(x25519::Recipient);

impl Recipient {
    /// Parses an `age1…` public key. `source` names where the value came from
    /// and is used in the missing-key error.
    pub fn parse(raw: &str, source: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::MissingRecipient(source.to_string()));
        }
        if trimmed.to_ascii_uppercase().starts_with(SECRET_KEY_PREFIX) {
            return Err(Error::SecretKeyAsRecipient);
        }
        x25519::Recipient::from_str(trimmed)
            .map(Self)
            .map_err(|reason| Error::InvalidRecipient {
                fingerprint: fingerprint(trimmed.as_bytes()),
                reason: reason.to_string(),
            })
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(self.0.to_string().as_bytes())
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Recipient").field(&self.0.to_string()).finish()
    }
}

/// Private key able to open records sealed to its public half.
pub struct Identity(x25519::Identity);

impl Identity {
    pub fn generate() -> Self {
        Self(x25519::Identity::generate())
    }

    pub fn public_key(&self) -> Recipient {
        Recipient(self.0.to_public())
    }

    /// Identity file in the layout age-keygen writes: a public key comment
    /// followed by the secret key line.
    pub fn to_file_contents(&self) -> Zeroizing<String> {
        let secret = self.0.to_string();
        Zeroizing::new(format!(
            "# public key: {}\n{}\n",
            self.public_key(),
            secret.expose_secret()
        ))
    }

    /// Writes the identity file to `path`, refusing to replace an existing
    /// file. On unix the file is readable by its owner only.
    pub fn write_new_file(&self, path: &Path) -> Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => Error::AlreadyExists(path.to_path_buf()),
            _ => Error::Io(e, format!("creating identity file {}", path.display())),
        })?;
        file.write_all(self.to_file_contents().as_bytes())
            .map_err(|e| Error::Io(e, format!("writing identity file {}", path.display())))
    }

    /// Reads the first secret key line from an identity file. Comment lines
    /// starting with `#` and blank lines are skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = Zeroizing::new(
            fs::read_to_string(path)
                .map_err(|e| Error::Io(e, format!("reading identity file {}", path.display())))?,
        );
        Self::from_file_contents(&contents, path)
    }

    fn from_file_contents(contents: &str, path: &Path) -> Result<Self> {
        let line = contents
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .ok_or_else(|| Error::MissingIdentity(path.to_path_buf()))?;

        x25519::Identity::from_str(line)
            .map(Self)
            .map_err(|reason| Error::InvalidIdentity {
                path: path.to_path_buf(),
                reason: reason.to_string(),
            })
    }
}

/// Base64 text of an age ciphertext, without line breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedCredentials(String);

impl SealedCredentials {
    pub fn from_ciphertext(ciphertext: &[u8]) -> Self {
        Self(STANDARD.encode(ciphertext))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes sealed text back to ciphertext bytes. Whitespace anywhere in
    /// the input is ignored, so wrapped or newline-terminated copies work.
    pub fn decode(text: &str) -> Result<Vec<u8>> {
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if compact.is_empty() {
            return Err(Error::EmptyInput);
        }
        match STANDARD.decode(compact.as_bytes()) {
            Ok(bytes) => Ok(bytes),
            // Unpadded copies are accepted; errors come from the padded decode.
            Err(padded) => STANDARD_NO_PAD
                .decode(compact.as_bytes())
                .map_err(|_| Error::Base64DecodeFailed(format!("{padded}"))),
        }
    }
}

impl fmt::Display for SealedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encrypts `plaintext` to `recipient` alone.
pub fn seal(recipient: &Recipient, plaintext: &[u8]) -> Result<SealedCredentials> {
    let ciphertext = age::encrypt(&recipient.0, plaintext)
        .map_err(|e| Error::EncryptionFailed(format!("{e}")))?;
    Ok(SealedCredentials::from_ciphertext(&ciphertext))
}

pub fn open(identity: &Identity, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    age::decrypt(&identity.0, ciphertext)
        .map(Zeroizing::new)
        .map_err(|e| Error::DecryptionFailed(format!("{e}")))
}

//! Error type shared by the library modules. The binary adds `anyhow` context
//! on top of these at the command boundary.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("the {0} secret must be present")]
    MissingRecipient(String),

    #[error("recipient looks like an age secret key; pass the public key instead")]
    SecretKeyAsRecipient,

    #[error("invalid age recipient (fingerprint {fingerprint}): {reason}")]
    InvalidRecipient {
        fingerprint: String,
        reason: String,
    },

    #[error("identity file {0} contains no AGE-SECRET-KEY line")]
    MissingIdentity(PathBuf),

    #[error("invalid identity in {path}: {reason}")]
    InvalidIdentity { path: PathBuf, reason: String },

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("base64 decoding failed: {0}")]
    Base64DecodeFailed(String),

    #[error("sealed input is empty")]
    EmptyInput,

    #[error("credential record is malformed: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    #[error("cannot encode credential record: {0}")]
    RecordEncoding(serde_json::Error),

    #[error("refusing to overwrite existing file {0}")]
    AlreadyExists(PathBuf),

    #[error("I/O error: {0}. Context: {1}")]
    Io(std::io::Error, String),
}

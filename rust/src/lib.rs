//! credseal: seal a CI job's ephemeral runtime credentials to an age
//! recipient, print them as one base64 line, and keep the job alive until
//! the operator releases it. The `reveal` side opens that line again with
//! the matching identity.

pub mod capture;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod environment;
pub mod error;
pub mod reveal;
pub mod session;

pub use error::{Error, Result};

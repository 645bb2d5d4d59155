//! Cryptography used by credseal: recipient-keyed sealing of credential
//! records and the fingerprints that let logs refer to keys and ciphertexts
//! without printing them.

pub mod integrity;
pub mod sealing;

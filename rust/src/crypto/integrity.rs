//! Integrity helpers. Fingerprints are short SHA-256 prefixes used to name a
//! key or ciphertext in log output.

use sha2::{Digest, Sha256};

const FINGERPRINT_HEX_LEN: usize = 16;

/// Produces a raw SHA-256 digest of the provided bytes.
pub fn sha256_digest(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Returns the hexadecimal representation of a SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = sha256_digest(data);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// First 16 hex characters of the SHA-256 of `data`.
pub fn fingerprint(data: &[u8]) -> String {
    let mut hex = sha256_hex(data);
    hex.truncate(FINGERPRINT_HEX_LEN);
    hex
}

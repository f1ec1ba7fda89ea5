//! Content hash validation

use std::fmt;

use crate::error::TransferError;

/// Prefix of a base58-encoded sha2-256 multihash (CIDv0)
pub const CID_V0_PREFIX: &str = "Qm";

/// Hashes of this length or shorter are rejected
const MIN_HASH_LEN_EXCLUSIVE: usize = 10;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// A content identifier that has passed the format check
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Validate `raw` (surrounding whitespace ignored). Pure; never touches the network.
    pub fn parse(raw: &str) -> Result<Self, TransferError> {
        let candidate = raw.trim();
        if candidate.is_empty() {
            return Err(TransferError::InvalidHash("hash is empty".to_string()));
        }
        if !candidate.starts_with(CID_V0_PREFIX) {
            return Err(TransferError::InvalidHash(format!(
                "{} (must start with {})",
                candidate, CID_V0_PREFIX
            )));
        }
        if candidate.len() <= MIN_HASH_LEN_EXCLUSIVE {
            return Err(TransferError::InvalidHash(format!("{} (too short)", candidate)));
        }
        if let Some(bad) = candidate.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(TransferError::InvalidHash(format!(
                "{} (unexpected character {:?})",
                candidate, bad
            )));
        }
        Ok(Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn is_valid_hash(raw: &str) -> bool {
    ContentHash::parse(raw).is_ok()
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

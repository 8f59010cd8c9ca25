// SPDX-License-Identifier: MIT

//! Content hashing: lowercase hex SHA-256 digests and their sharded
//! object-store path form.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;
use thiserror::Error;

/// A lowercase hex SHA-256 digest (64 chars).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hash(String);

#[derive(Debug, Error)]
#[error("invalid hash {0:?}: expected 64 lowercase hex characters")]
pub struct InvalidHash(pub String);

impl Hash {
    /// Digest the given bytes in one shot.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Digest a stream without buffering it whole into memory.
    pub fn of_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `n` characters, for display purposes.
    pub fn abbrev(&self, n: usize) -> &str {
        &self.0[..n.min(self.0.len())]
    }

    /// Sharded relative path: `<first-two>/<remaining-62>`.
    pub fn shard_path(&self) -> (String, String) {
        (self.0[..2].to_string(), self.0[2..].to_string())
    }

    fn validate(s: &str) -> Result<(), InvalidHash> {
        if s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
            Ok(())
        } else {
            Err(InvalidHash(s.to_string()))
        }
    }
}

impl FromStr for Hash {
    type Err = InvalidHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::validate(s)?;
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Hash {
    type Error = InvalidHash;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<Hash> for String {
    fn from(h: Hash) -> Self {
        h.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::borrow::Borrow<str> for Hash {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;

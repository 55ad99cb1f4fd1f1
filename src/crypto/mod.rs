//! Cryptographic primitives for USM authentication.
//!
//! Provides password-to-key localization and truncated HMAC digests.

pub mod kdf;
pub mod mac;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::AuthError;

pub use kdf::{LocalizedKey, MasterKey, password_to_key};
pub use mac::AuthDigest;

/// Size of the password expansion hashed into the master key (1 MiB).
pub const EXPANSION_LEN: usize = 1_048_576;
/// Chunk size the expansion is fed to the hash in.
pub const CHUNK_LEN: usize = 64;
/// Shortest accepted passphrase (8 bytes).
pub const MIN_PASSWORD_LEN: usize = 8;
/// Length of the HMAC-96 authentication digest (12 bytes).
pub const DIGEST_LEN: usize = 12;

/// Authentication protocols a provider can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthAlgorithm {
    /// HMAC-MD5-96
    Md5,
    /// HMAC-SHA-96
    Sha1,
}

impl AuthAlgorithm {
    /// Native output length of the underlying hash, which is also the
    /// length of derived keys.
    pub fn key_len(self) -> usize {
        match self {
            AuthAlgorithm::Md5 => 16,
            AuthAlgorithm::Sha1 => 20,
        }
    }

    /// Length of the truncated digest carried in messages.
    pub fn digest_len(self) -> usize {
        match self {
            AuthAlgorithm::Md5 | AuthAlgorithm::Sha1 => DIGEST_LEN,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AuthAlgorithm::Md5 => "md5",
            AuthAlgorithm::Sha1 => "sha1",
        }
    }
}

impl fmt::Display for AuthAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AuthAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(AuthAlgorithm::Md5),
            "sha" | "sha1" | "sha-1" => Ok(AuthAlgorithm::Sha1),
            _ => Err(AuthError::argument(
                "algorithm",
                "expected one of: md5, sha, sha1, sha-1",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_match_hash_output() {
        assert_eq!(AuthAlgorithm::Md5.key_len(), 16);
        assert_eq!(AuthAlgorithm::Sha1.key_len(), 20);
        assert_eq!(AuthAlgorithm::Md5.digest_len(), 12);
        assert_eq!(AuthAlgorithm::Sha1.digest_len(), 12);
    }

    #[test]
    fn parse_accepts_common_spellings() {
        assert_eq!("MD5".parse::<AuthAlgorithm>().unwrap(), AuthAlgorithm::Md5);
        assert_eq!("sha".parse::<AuthAlgorithm>().unwrap(), AuthAlgorithm::Sha1);
        assert_eq!("SHA-1".parse::<AuthAlgorithm>().unwrap(), AuthAlgorithm::Sha1);
        assert!("sha256".parse::<AuthAlgorithm>().is_err());
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for alg in [AuthAlgorithm::Md5, AuthAlgorithm::Sha1] {
            assert_eq!(alg.to_string().parse::<AuthAlgorithm>().unwrap(), alg);
        }
    }
}

use std::fmt;

use digest::Digest;
use hmac::Mac;
use hmac::SimpleHmac;
use hmac::digest::KeyInit;
use hmac::digest::core_api::BlockSizeUser;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::AuthAlgorithm;
use crate::error::AuthError;

/// Truncated keyed-hash value carried in a message's authentication field.
///
/// Its length is fixed per algorithm ([`AuthAlgorithm::digest_len`]),
/// independent of message size or passphrase.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthDigest {
    bytes: Vec<u8>,
}

impl AuthDigest {
    /// All-zero placeholder installed before the digest is computed.
    pub fn clean(algorithm: AuthAlgorithm) -> Self {
        Self {
            bytes: vec![0u8; algorithm.digest_len()],
        }
    }

    /// Wraps a digest received on the wire.
    pub fn from_bytes(algorithm: AuthAlgorithm, bytes: &[u8]) -> Result<Self, AuthError> {
        if bytes.len() != algorithm.digest_len() {
            return Err(AuthError::argument(
                "digest",
                "length does not match the algorithm's digest length",
            ));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    pub fn from_hex(algorithm: AuthAlgorithm, s: &str) -> Result<Self, AuthError> {
        let bytes =
            hex::decode(s.trim()).map_err(|_| AuthError::argument("digest", "not valid hex"))?;
        Self::from_bytes(algorithm, &bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True if this is the zero-filled placeholder.
    pub fn is_clean(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Constant-time comparison; a length mismatch is never equal.
    pub fn ct_eq(&self, other: &[u8]) -> bool {
        if self.bytes.len() != other.len() {
            return false;
        }
        self.bytes.as_slice().ct_eq(other).into()
    }
}

impl AsRef<[u8]> for AuthDigest {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for AuthDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthDigest({})", self.to_hex())
    }
}

impl fmt::Display for AuthDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// HMAC over `data` keyed with `key`, truncated to the digest length.
pub(crate) fn truncated_hmac(
    algorithm: AuthAlgorithm,
    key: &[u8],
    data: &[u8],
) -> Result<AuthDigest, AuthError> {
    let full = match algorithm {
        AuthAlgorithm::Md5 => keyed_hash::<md5::Md5>(key, data)?,
        AuthAlgorithm::Sha1 => keyed_hash::<sha1::Sha1>(key, data)?,
    };

    Ok(AuthDigest {
        bytes: full[..algorithm.digest_len()].to_vec(),
    })
}

fn keyed_hash<D>(key: &[u8], data: &[u8]) -> Result<Zeroizing<Vec<u8>>, AuthError>
where
    D: Digest + BlockSizeUser,
{
    let mut mac = <SimpleHmac<D> as KeyInit>::new_from_slice(key)
        .map_err(|_| AuthError::argument("key", "rejected by HMAC"))?;
    Mac::update(&mut mac, data);
    Ok(Zeroizing::new(mac.finalize().into_bytes().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_digest_is_zero_filled() {
        let clean = AuthDigest::clean(AuthAlgorithm::Sha1);
        assert_eq!(clean.as_bytes(), &[0u8; 12]);
        assert!(clean.is_clean());
        assert_eq!(AuthDigest::clean(AuthAlgorithm::Md5).as_bytes().len(), 12);
    }

    #[test]
    fn hmac_sha1_96_matches_reference() {
        // RFC 2202 test case 2
        let digest = truncated_hmac(
            AuthAlgorithm::Sha1,
            b"Jefe",
            b"what do ya want for nothing?",
        )
        .unwrap();
        assert_eq!(digest.to_hex(), "effcdf6ae5eb2fa2d27416d5");
    }

    #[test]
    fn hmac_md5_96_matches_reference() {
        // RFC 2104 / RFC 2202 test case 2
        let digest =
            truncated_hmac(AuthAlgorithm::Md5, b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(digest.to_hex(), "750c783e6ab0b503eaa86e31");
    }

    #[test]
    fn digest_length_ignores_input_size() {
        for len in [0usize, 1, 64, 4096] {
            let data = vec![0xabu8; len];
            let digest = truncated_hmac(AuthAlgorithm::Md5, &[7u8; 16], &data).unwrap();
            assert_eq!(digest.as_bytes().len(), AuthAlgorithm::Md5.digest_len());
        }
    }

    #[test]
    fn ct_eq_rejects_length_mismatch() {
        let d = AuthDigest::clean(AuthAlgorithm::Sha1);
        assert!(d.ct_eq(&[0u8; 12]));
        assert!(!d.ct_eq(&[0u8; 11]));
        assert!(!d.ct_eq(&[1u8; 12]));
    }

    #[test]
    fn ct_eq_compares_every_byte() {
        let key = [0x0bu8; 20];
        let digest = truncated_hmac(AuthAlgorithm::Sha1, &key, b"Hi There").unwrap();
        let same = AuthDigest::from_bytes(AuthAlgorithm::Sha1, digest.as_bytes()).unwrap();
        assert!(digest.ct_eq(same.as_bytes()));

        for at in [0, 5, 11] {
            let mut flipped = digest.as_bytes().to_vec();
            flipped[at] ^= 0x80;
            assert!(!digest.ct_eq(&flipped), "flip at {at} went unnoticed");
        }
    }

    #[test]
    fn from_hex_checks_length() {
        assert!(AuthDigest::from_hex(AuthAlgorithm::Sha1, "00112233445566778899aabb").is_ok());
        assert!(AuthDigest::from_hex(AuthAlgorithm::Sha1, "0011").is_err());
        assert!(AuthDigest::from_hex(AuthAlgorithm::Sha1, "zz").is_err());
    }
}

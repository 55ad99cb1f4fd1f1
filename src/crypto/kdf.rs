use std::fmt;

use digest::Digest;
use tracing::debug;
use zeroize::Zeroizing;

use super::mac::{self, AuthDigest};
use super::{AuthAlgorithm, CHUNK_LEN, EXPANSION_LEN, MIN_PASSWORD_LEN};
use crate::error::AuthError;

/// Engine-independent key (Ku): the hash of the password repeated over 1 MiB.
///
/// This is the expensive half of key derivation. It only depends on the
/// password, so it can be computed once and localized to many engines.
#[derive(Clone)]
pub struct MasterKey {
    algorithm: AuthAlgorithm,
    key: Zeroizing<Vec<u8>>,
}

impl MasterKey {
    /// Hashes the password expanded to [`EXPANSION_LEN`] bytes.
    ///
    /// The expansion is fed to the hash in [`CHUNK_LEN`] byte chunks, with
    /// the password cursor wrapping modulo the password length rather than at
    /// chunk boundaries. The result is identical to hashing the whole 1 MiB
    /// buffer at once.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Argument`] if the password is shorter than
    /// [`MIN_PASSWORD_LEN`] bytes.
    pub fn from_password(algorithm: AuthAlgorithm, password: &[u8]) -> Result<Self, AuthError> {
        validate_password(password)?;

        debug!(%algorithm, "expanding password to master key");
        let key = match algorithm {
            AuthAlgorithm::Md5 => expand::<md5::Md5>(password),
            AuthAlgorithm::Sha1 => expand::<sha1::Sha1>(password),
        };

        Ok(Self { algorithm, key })
    }

    /// Binds this key to one engine: `H(Ku || engine_id || Ku)`.
    ///
    /// An empty engine id is hashed as-is, giving `H(Ku || Ku)`.
    pub fn localize(&self, engine_id: &[u8]) -> LocalizedKey {
        let key = match self.algorithm {
            AuthAlgorithm::Md5 => localize::<md5::Md5>(&self.key, engine_id),
            AuthAlgorithm::Sha1 => localize::<sha1::Sha1>(&self.key, engine_id),
        };

        LocalizedKey {
            algorithm: self.algorithm,
            key,
        }
    }

    pub fn algorithm(&self) -> AuthAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey")
            .field("algorithm", &self.algorithm)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Key (Kul) bound to a single authoritative engine, used to key the HMAC.
#[derive(Clone)]
pub struct LocalizedKey {
    algorithm: AuthAlgorithm,
    key: Zeroizing<Vec<u8>>,
}

impl LocalizedKey {
    /// Wraps an already localized key, e.g. one loaded from configuration.
    pub fn from_bytes(algorithm: AuthAlgorithm, key: &[u8]) -> Result<Self, AuthError> {
        if key.len() != algorithm.key_len() {
            return Err(AuthError::argument(
                "key",
                "length does not match the algorithm's hash output",
            ));
        }
        Ok(Self {
            algorithm,
            key: Zeroizing::new(key.to_vec()),
        })
    }

    pub fn algorithm(&self) -> AuthAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Keyed hash over `data`, truncated to the algorithm's digest length.
    pub fn sign(&self, data: &[u8]) -> Result<AuthDigest, AuthError> {
        mac::truncated_hmac(self.algorithm, &self.key, data)
    }

    /// Recomputes the digest over `data` and compares it with `expected`
    /// in constant time.
    pub fn verify(&self, data: &[u8], expected: &[u8]) -> bool {
        self.sign(data)
            .map(|digest| digest.ct_eq(expected))
            .unwrap_or(false)
    }
}

impl fmt::Debug for LocalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalizedKey")
            .field("algorithm", &self.algorithm)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derives the localized key for `password` and `engine_id` in one step.
///
/// # Errors
///
/// Returns [`AuthError::Argument`] if the password is shorter than
/// [`MIN_PASSWORD_LEN`] bytes.
pub fn password_to_key(
    algorithm: AuthAlgorithm,
    password: &[u8],
    engine_id: &[u8],
) -> Result<LocalizedKey, AuthError> {
    Ok(MasterKey::from_password(algorithm, password)?.localize(engine_id))
}

fn validate_password(password: &[u8]) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::argument("password", "must be at least 8 bytes"));
    }
    Ok(())
}

fn expand<D: Digest>(password: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut hasher = D::new();
    let mut chunk = Zeroizing::new([0u8; CHUNK_LEN]);
    let mut index = 0;
    let mut count = 0;

    while count < EXPANSION_LEN {
        for byte in chunk.iter_mut() {
            *byte = password[index];
            index = (index + 1) % password.len();
        }
        hasher.update(&chunk[..]);
        count += CHUNK_LEN;
    }

    Zeroizing::new(hasher.finalize().to_vec())
}

fn localize<D: Digest>(master: &[u8], engine_id: &[u8]) -> Zeroizing<Vec<u8>> {
    let digest = D::new()
        .chain_update(master)
        .chain_update(engine_id)
        .chain_update(master)
        .finalize();
    Zeroizing::new(digest.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGINE_2: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2];

    #[test]
    fn master_key_md5_matches_rfc3414() {
        let master = MasterKey::from_password(AuthAlgorithm::Md5, b"maplesyrup").unwrap();
        assert_eq!(
            hex::encode(master.as_bytes()),
            "9faf3283884e92834ebc9847d8edd963"
        );
    }

    #[test]
    fn master_key_sha1_matches_rfc3414() {
        let master = MasterKey::from_password(AuthAlgorithm::Sha1, b"maplesyrup").unwrap();
        assert_eq!(
            hex::encode(master.as_bytes()),
            "9fb5cc0381497b3793528939ff788d5d79145211"
        );
    }

    #[test]
    fn localized_key_md5_matches_rfc3414() {
        let key = password_to_key(AuthAlgorithm::Md5, b"maplesyrup", &ENGINE_2).unwrap();
        assert_eq!(key.as_bytes().len(), 16);
        assert_eq!(
            hex::encode(key.as_bytes()),
            "526f5eed9fcce26f8964c2930787d82b"
        );
    }

    #[test]
    fn localized_key_sha1_matches_rfc3414() {
        let key = password_to_key(AuthAlgorithm::Sha1, b"maplesyrup", &ENGINE_2).unwrap();
        assert_eq!(key.as_bytes().len(), 20);
        assert_eq!(
            hex::encode(key.as_bytes()),
            "6695febc9288e36282235fc7151f128497b38f3f"
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        let k1 = password_to_key(AuthAlgorithm::Sha1, b"maplesyrup", &ENGINE_2).unwrap();
        let k2 = password_to_key(AuthAlgorithm::Sha1, b"maplesyrup", &ENGINE_2).unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn different_engines_get_different_keys() {
        let master = MasterKey::from_password(AuthAlgorithm::Sha1, b"maplesyrup").unwrap();
        let mut engine_1 = ENGINE_2;
        engine_1[11] = 1;

        let k1 = master.localize(&engine_1);
        let k2 = master.localize(&ENGINE_2);

        assert_ne!(k1.as_bytes(), k2.as_bytes());
        assert_eq!(
            hex::encode(k1.as_bytes()),
            "908e91d4421383d5e705d7f68df6a078ceb68860"
        );
    }

    #[test]
    fn cached_master_key_localizes_like_one_shot() {
        let master = MasterKey::from_password(AuthAlgorithm::Md5, b"maplesyrup").unwrap();
        let via_master = master.localize(&ENGINE_2);
        let direct = password_to_key(AuthAlgorithm::Md5, b"maplesyrup", &ENGINE_2).unwrap();
        assert_eq!(via_master.as_bytes(), direct.as_bytes());
    }

    #[test]
    fn seven_byte_password_is_rejected() {
        let err = password_to_key(AuthAlgorithm::Sha1, b"1234567", &ENGINE_2).unwrap_err();
        assert!(err.is_argument());
        assert!(MasterKey::from_password(AuthAlgorithm::Md5, b"").is_err());
    }

    #[test]
    fn eight_byte_password_is_accepted() {
        assert!(password_to_key(AuthAlgorithm::Md5, b"12345678", &ENGINE_2).is_ok());
    }

    #[test]
    fn empty_engine_id_localizes_master_key_twice() {
        let sha1 = password_to_key(AuthAlgorithm::Sha1, b"maplesyrup", &[]).unwrap();
        assert_eq!(
            hex::encode(sha1.as_bytes()),
            "51483eb2a8bd25a3ffb8bd1f02d17114ba8effcd"
        );

        let master = MasterKey::from_password(AuthAlgorithm::Md5, b"maplesyrup").unwrap();
        assert_eq!(
            hex::encode(master.localize(&[]).as_bytes()),
            "acf77739036b40ec1bf3a1c091e96987"
        );
    }

    #[test]
    fn password_errors_name_the_password() {
        for password in [&b""[..], b"1234567"] {
            match MasterKey::from_password(AuthAlgorithm::Sha1, password) {
                Err(AuthError::Argument { param, reason }) => {
                    assert_eq!(param, "password");
                    assert_eq!(reason, "must be at least 8 bytes");
                }
                other => panic!("expected Argument error, got: {other:?}"),
            }
        }
    }

    #[test]
    fn from_bytes_checks_length() {
        assert!(LocalizedKey::from_bytes(AuthAlgorithm::Md5, &[1u8; 16]).is_ok());
        assert!(LocalizedKey::from_bytes(AuthAlgorithm::Md5, &[1u8; 20]).is_err());
        assert!(LocalizedKey::from_bytes(AuthAlgorithm::Sha1, &[1u8; 20]).is_ok());
    }

    #[test]
    fn verify_accepts_own_digest_only() {
        let key = password_to_key(AuthAlgorithm::Md5, b"maplesyrup", &ENGINE_2).unwrap();
        let digest = key.sign(b"some message").unwrap();

        assert!(key.verify(b"some message", digest.as_bytes()));
        assert!(!key.verify(b"some messagE", digest.as_bytes()));
        assert!(!key.verify(b"some message", &digest.as_bytes()[..11]));
    }

    #[test]
    fn debug_output_redacts_key_material() {
        let key = password_to_key(AuthAlgorithm::Sha1, b"maplesyrup", &ENGINE_2).unwrap();
        let out = format!("{key:?}");
        assert!(out.contains("REDACTED"));
        assert!(!out.contains("6695febc"));
    }
}

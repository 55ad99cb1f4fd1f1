use std::fmt;
use std::sync::OnceLock;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::crypto::{self, AuthAlgorithm, AuthDigest, LocalizedKey, MIN_PASSWORD_LEN, MasterKey};
use crate::error::AuthError;
use crate::message::{AuthenticatedMessage, UsmMessage};

/// Computes USM authentication digests for one user passphrase.
///
/// The provider is immutable after construction and can be shared between
/// threads. The engine-independent master key is derived at most once and
/// cached; each digest localizes it to the message's engine.
pub struct AuthenticationProvider {
    algorithm: AuthAlgorithm,
    passphrase: Zeroizing<Vec<u8>>,
    master: OnceLock<MasterKey>,
}

impl AuthenticationProvider {
    /// # Errors
    ///
    /// Returns [`AuthError::Argument`] if the passphrase is shorter than
    /// [`MIN_PASSWORD_LEN`] bytes.
    pub fn new(algorithm: AuthAlgorithm, passphrase: &[u8]) -> Result<Self, AuthError> {
        if passphrase.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::argument("passphrase", "must be at least 8 bytes"));
        }

        Ok(Self {
            algorithm,
            passphrase: Zeroizing::new(passphrase.to_vec()),
            master: OnceLock::new(),
        })
    }

    /// HMAC-SHA-96 provider.
    pub fn sha1(passphrase: &[u8]) -> Result<Self, AuthError> {
        Self::new(AuthAlgorithm::Sha1, passphrase)
    }

    /// HMAC-MD5-96 provider.
    pub fn md5(passphrase: &[u8]) -> Result<Self, AuthError> {
        Self::new(AuthAlgorithm::Md5, passphrase)
    }

    pub fn algorithm(&self) -> AuthAlgorithm {
        self.algorithm
    }

    /// Derives the key for `password` localized to `engine_id` with this
    /// provider's hash. Does not touch the provider's own passphrase.
    pub fn password_to_key(
        &self,
        password: &[u8],
        engine_id: &[u8],
    ) -> Result<LocalizedKey, AuthError> {
        crypto::password_to_key(self.algorithm, password, engine_id)
    }

    /// Zero-filled placeholder with the exact length [`compute_hash`](Self::compute_hash) returns.
    pub fn clean_digest(&self) -> AuthDigest {
        AuthDigest::clean(self.algorithm)
    }

    /// Computes the digest over the message as currently serialized.
    ///
    /// The message must already carry [`clean_digest`](Self::clean_digest)
    /// in its digest field. The message is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidState`] if the message has no
    /// authoritative engine id yet.
    pub fn compute_hash<M>(&self, message: &M) -> Result<AuthDigest, AuthError>
    where
        M: UsmMessage + ?Sized,
    {
        let engine_id = match message.engine_id() {
            Some(id) if !id.is_empty() => id,
            _ => {
                return Err(AuthError::InvalidState(
                    "message has no authoritative engine id",
                ));
            }
        };

        let key = self.master_key()?.localize(engine_id);
        let bytes = Zeroizing::new(message.to_bytes());

        debug!(
            algorithm = %self.algorithm,
            engine_id_len = engine_id.len(),
            message_len = bytes.len(),
            "computing message digest"
        );
        key.sign(&bytes)
    }

    /// Moves a message from unsigned to signed: installs the placeholder,
    /// computes the digest over that serialization, then installs the digest.
    pub fn sign<M>(&self, message: &mut M) -> Result<AuthDigest, AuthError>
    where
        M: AuthenticatedMessage + ?Sized,
    {
        if message.engine_id().is_none_or(|id| id.is_empty()) {
            return Err(AuthError::InvalidState(
                "message has no authoritative engine id",
            ));
        }

        message.set_digest(&self.clean_digest())?;
        let digest = self.compute_hash(&*message)?;
        message.set_digest(&digest)?;
        Ok(digest)
    }

    /// Checks the digest carried by an incoming message.
    ///
    /// The digest is recomputed over a copy whose digest field holds the
    /// placeholder, then compared in constant time.
    pub fn verify<M>(&self, message: &M) -> Result<bool, AuthError>
    where
        M: AuthenticatedMessage + Clone,
    {
        let received = message.digest().to_vec();
        if received.len() != self.algorithm.digest_len() {
            warn!(
                received_len = received.len(),
                expected_len = self.algorithm.digest_len(),
                "digest field has the wrong length"
            );
            return Ok(false);
        }

        let mut unsigned = message.clone();
        unsigned.set_digest(&self.clean_digest())?;
        let matches = self.compute_hash(&unsigned)?.ct_eq(&received);

        if !matches {
            warn!(algorithm = %self.algorithm, "message digest mismatch");
        }
        Ok(matches)
    }

    fn master_key(&self) -> Result<&MasterKey, AuthError> {
        if let Some(master) = self.master.get() {
            return Ok(master);
        }
        let master = MasterKey::from_password(self.algorithm, &self.passphrase)?;
        Ok(self.master.get_or_init(|| master))
    }
}

impl fmt::Debug for AuthenticationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationProvider")
            .field("algorithm", &self.algorithm)
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}

//! Contract between the authentication provider and the message layer.
//!
//! The provider never parses messages. It only needs the authoritative
//! engine id and the serialized bytes, with whatever currently sits in the
//! digest field.

use std::ops::Range;

use crate::crypto::AuthDigest;
use crate::error::AuthError;

/// A message that can be authenticated.
pub trait UsmMessage {
    /// Authoritative engine id, or `None` while it is still unknown
    /// (before discovery).
    fn engine_id(&self) -> Option<&[u8]>;

    /// Serialization reflecting the current content of the digest field.
    fn to_bytes(&self) -> Vec<u8>;
}

/// A message whose digest field can be read and replaced, so the
/// placeholder-then-digest lifecycle can be driven by the provider.
pub trait AuthenticatedMessage: UsmMessage {
    fn digest(&self) -> &[u8];

    fn set_digest(&mut self, digest: &AuthDigest) -> Result<(), AuthError>;
}

/// An already serialized message with a known digest field position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    bytes: Vec<u8>,
    engine_id: Option<Vec<u8>>,
    digest_offset: usize,
    digest_len: usize,
}

impl RawMessage {
    /// # Errors
    ///
    /// Returns [`AuthError::Argument`] if the digest field does not fit
    /// inside `bytes`.
    pub fn new(bytes: Vec<u8>, digest_offset: usize, digest_len: usize) -> Result<Self, AuthError> {
        let fits = digest_offset
            .checked_add(digest_len)
            .is_some_and(|end| end <= bytes.len());
        if !fits {
            return Err(AuthError::argument(
                "digest_offset",
                "digest field extends past the end of the message",
            ));
        }

        Ok(Self {
            bytes,
            engine_id: None,
            digest_offset,
            digest_len,
        })
    }

    pub fn with_engine_id(mut self, engine_id: impl Into<Vec<u8>>) -> Self {
        self.engine_id = Some(engine_id.into());
        self
    }

    /// Records the engine id learned from discovery.
    pub fn set_engine_id(&mut self, engine_id: impl Into<Vec<u8>>) {
        self.engine_id = Some(engine_id.into());
    }

    pub fn digest_range(&self) -> Range<usize> {
        self.digest_offset..self.digest_offset + self.digest_len
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl UsmMessage for RawMessage {
    fn engine_id(&self) -> Option<&[u8]> {
        self.engine_id.as_deref()
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

impl AuthenticatedMessage for RawMessage {
    fn digest(&self) -> &[u8] {
        &self.bytes[self.digest_range()]
    }

    fn set_digest(&mut self, digest: &AuthDigest) -> Result<(), AuthError> {
        if digest.as_bytes().len() != self.digest_len {
            return Err(AuthError::argument(
                "digest",
                "length does not match the message's digest field",
            ));
        }
        let range = self.digest_range();
        self.bytes[range].copy_from_slice(digest.as_bytes());
        Ok(())
    }
}

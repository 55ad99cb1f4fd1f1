//! SNMPv3 User-based Security Model (RFC 3414) authentication.
//!
//! Derives engine-localized keys from a user passphrase and computes the
//! truncated HMAC digest carried in a message's authentication field.
//!
//! ```no_run
//! use usmauth::{AuthenticationProvider, RawMessage};
//!
//! # fn main() -> Result<(), usmauth::AuthError> {
//! let provider = AuthenticationProvider::sha1(b"maplesyrup")?;
//! let mut msg = RawMessage::new(vec![0u8; 64], 20, 12)?
//!     .with_engine_id(vec![0x80, 0x00, 0x1f, 0x88, 0x04]);
//!
//! let digest = provider.sign(&mut msg)?;
//! assert!(provider.verify(&msg)?);
//! # let _ = digest;
//! # Ok(())
//! # }
//! ```

pub mod crypto;
mod error;
pub mod message;
mod provider;

pub use crate::crypto::{AuthAlgorithm, AuthDigest, LocalizedKey, MasterKey, password_to_key};
pub use crate::error::AuthError;
pub use crate::message::{AuthenticatedMessage, RawMessage, UsmMessage};
pub use crate::provider::AuthenticationProvider;

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The caller passed an unusable value. Retrying with the same input fails again.
    Argument {
        param: &'static str,
        reason: &'static str,
    },
    /// The message is not ready to be authenticated, e.g. its authoritative
    /// engine id has not been discovered yet.
    InvalidState(&'static str),
}

impl AuthError {
    pub(crate) fn argument(param: &'static str, reason: &'static str) -> Self {
        AuthError::Argument { param, reason }
    }

    pub fn is_argument(&self) -> bool {
        matches!(self, AuthError::Argument { .. })
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, AuthError::InvalidState(_))
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Argument { param, reason } => write!(f, "invalid {param}: {reason}"),
            AuthError::InvalidState(reason) => write!(f, "invalid state: {reason}"),
        }
    }
}

impl std::error::Error for AuthError {}

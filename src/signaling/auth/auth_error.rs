use thiserror::Error;

use crate::signaling::errors::AuthErrorCode;

/// High-level auth error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no credential presented")]
    MissingCredential,
    #[error("credential rejected")]
    InvalidCredential,
    #[error("auth backend failure")]
    Internal,
}

impl AuthError {
    pub fn code(self) -> AuthErrorCode {
        match self {
            Self::MissingCredential => AuthErrorCode::MissingCredential,
            Self::InvalidCredential => AuthErrorCode::InvalidCredential,
            Self::Internal => AuthErrorCode::Internal,
        }
    }
}

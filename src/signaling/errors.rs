use std::io;

use thiserror::Error;

use crate::config::ConfigError;

#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AuthErrorCode {
    MissingCredential = 1,
    InvalidCredential = 2,
    Internal = 3,
}

impl AuthErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            1 => Some(Self::MissingCredential),
            2 => Some(Self::InvalidCredential),
            3 => Some(Self::Internal),
            _ => None,
        }
    }
}

#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JoinErrorCode {
    NotAuthorized = 10,
    InvalidRoom = 11,
}

impl JoinErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            10 => Some(Self::NotAuthorized),
            11 => Some(Self::InvalidRoom),
            _ => None,
        }
    }
}

/// Startup failures of the relay process.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("io: {0}")]
    Io(#[from] io::Error),
}

use std::io;

use thiserror::Error;

/// Protocol-level errors (body parsing/format issues, etc.).
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("unknown message type 0x{0:02x}")]
    UnknownType(u8),
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
    #[error("message body truncated")]
    Truncated,
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,
    #[error("frame body of {len} bytes exceeds limit of {max}")]
    TooLarge { len: usize, max: usize },
    #[error("invalid format: {0}")]
    InvalidFormat(&'static str),
    #[error("string of {actual} bytes exceeds {max}")]
    StringTooLong { max: usize, actual: usize },
    #[error("unknown track kind {0}")]
    UnknownTrackKind(u8),
}

/// Frame-level error wrapper: IO vs protocol.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("protocol: {0}")]
    Proto(#[from] ProtoError),
}

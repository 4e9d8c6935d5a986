use std::io;

use thiserror::Error;

use crate::signaling::protocol::FrameError;

/// Errors that can occur while connecting or sending signaling messages.
///
/// Once connected, the only thing `send()` can reliably report is that the
/// signaling client is disconnected (the writer thread has exited and
/// dropped its receiver).
#[derive(Debug, Error)]
pub enum SignalingClientError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Frame(#[from] FrameError),
    #[error("relay refused credentials (code {code})")]
    AuthRefused { code: u16 },
    #[error("no authentication reply from relay")]
    HandshakeTimeout,
    #[error("unexpected {0} during handshake")]
    UnexpectedHandshake(&'static str),
    #[error("signaling client disconnected")]
    Disconnected,
}

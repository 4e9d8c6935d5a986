use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::signaling::protocol::SignalingMsg;
use crate::signaling_client::{SignalingChannel, SignalingClientError};

/// In-memory channel that records what would have been sent. Used by tests
/// and by in-process harnesses that pump messages through a `Router`.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<SignalingMsg>>,
    disconnected: AtomicBool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything sent so far.
    pub fn take(&self) -> Vec<SignalingMsg> {
        self.sent
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }

    /// Snapshot without draining.
    pub fn sent(&self) -> Vec<SignalingMsg> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Make further sends fail with `Disconnected`.
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    /// Accept sends again after `disconnect`.
    pub fn reconnect(&self) {
        self.disconnected.store(false, Ordering::SeqCst);
    }
}

impl SignalingChannel for RecordingChannel {
    fn send(&self, msg: SignalingMsg) -> Result<(), SignalingClientError> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(SignalingClientError::Disconnected);
        }
        self.sent
            .lock()
            .map_err(|_| SignalingClientError::Disconnected)?
            .push(msg);
        Ok(())
    }
}

use thiserror::Error;

use crate::call::CallStatus;
use crate::media::MediaAcquisitionError;
use crate::peer::PeerError;
use crate::signaling_client::SignalingClientError;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("cannot {op} while {status}")]
    InvalidState {
        op: &'static str,
        status: CallStatus,
    },
    #[error("cannot call yourself")]
    SelfCall,
    #[error("media: {0}")]
    Media(#[from] MediaAcquisitionError),
    #[error("peer: {0}")]
    Peer(#[from] PeerError),
    #[error("signaling: {0}")]
    Signaling(#[from] SignalingClientError),
}

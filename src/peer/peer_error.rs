use thiserror::Error;

use crate::peer::SignalingState;
use crate::sdp::SdpError;
use crate::signaling::protocol::UserId;
use crate::signaling_client::SignalingClientError;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer connection is closed")]
    Closed,
    #[error("{op} not allowed in state {state}")]
    InvalidState {
        op: &'static str,
        state: SignalingState,
    },
    #[error("no remote description applied yet")]
    NoRemoteDescription,
    #[error("malformed candidate {0:?}")]
    InvalidCandidate(String),
    #[error("unknown track {0}")]
    UnknownTrack(String),
    #[error("no link to {0}")]
    UnknownPeer(UserId),
    #[error("sdp: {0}")]
    Sdp(#[from] SdpError),
    #[error("signaling: {0}")]
    Signaling(#[from] SignalingClientError),
}

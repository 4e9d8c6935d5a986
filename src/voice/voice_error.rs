use thiserror::Error;

use crate::media::MediaAcquisitionError;
use crate::peer::PeerError;
use crate::signaling::protocol::RoomId;
use crate::signaling_client::SignalingClientError;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("not in a voice room")]
    NotInRoom,
    #[error("already in room {0}")]
    AlreadyInRoom(RoomId),
    #[error("room id must not be empty")]
    EmptyRoomId,
    #[error("media: {0}")]
    Media(#[from] MediaAcquisitionError),
    #[error("peer: {0}")]
    Peer(#[from] PeerError),
    #[error("signaling: {0}")]
    Signaling(#[from] SignalingClientError),
}

use crate::media::{LocalTrack, RemoteTrack};
use crate::peer::PeerError;
use crate::signaling::protocol::IceCandidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Tracks that appeared or disappeared when a remote description was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteTrackChanges {
    pub added: Vec<RemoteTrack>,
    /// Ids of tracks the remote stopped sending.
    pub removed: Vec<String>,
}

/// The media engine behind one peer link: what a browser calls an
/// `RTCPeerConnection`. The orchestrator owns the negotiation rules; the
/// engine only refuses operations that make no sense for it.
pub trait PeerConnection: Send {
    fn add_track(&mut self, track: &LocalTrack) -> Result<(), PeerError>;
    fn remove_track(&mut self, track_id: &str) -> Result<(), PeerError>;
    fn set_track_enabled(&mut self, track_id: &str, enabled: bool) -> Result<(), PeerError>;

    /// Create an offer and install it as the local description.
    fn create_offer(&mut self) -> Result<String, PeerError>;
    /// Create an answer to the applied remote offer and install it.
    fn create_answer(&mut self) -> Result<String, PeerError>;

    fn set_remote_description(
        &mut self,
        kind: SdpKind,
        sdp: &str,
    ) -> Result<RemoteTrackChanges, PeerError>;
    fn has_remote_description(&self) -> bool;

    /// Fails with `NoRemoteDescription` until a remote description is set.
    fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<(), PeerError>;
    /// Candidates applied so far, in application order.
    fn remote_candidates(&self) -> Vec<IceCandidate>;
    /// Locally gathered candidates not yet handed out.
    fn take_local_candidates(&mut self) -> Vec<IceCandidate>;

    fn remote_tracks(&self) -> Vec<RemoteTrack>;
    fn close(&mut self);
}

/// Builds engines for new links.
pub trait PeerConnectionFactory: Send + Sync {
    fn create(&self, remote_user: &str) -> Box<dyn PeerConnection>;
}

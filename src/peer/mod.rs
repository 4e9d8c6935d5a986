//! Client-side peer connection management: one negotiation state machine per
//! remote user, candidate buffering, and classification of inbound media.
pub mod candidate_queue;
pub mod classifier;
pub mod orchestrator;
pub mod peer_connection;
pub mod peer_error;
pub mod peer_link;
pub mod sdp_peer_connection;
pub mod signaling_state;

pub use candidate_queue::{CandidateQueue, MAX_QUEUED_CANDIDATES};
pub use classifier::{MediaSlot, PeerMedia, StreamClassifier};
pub use orchestrator::{PeerOrchestrator, PeerUpdate};
pub use peer_connection::{PeerConnection, PeerConnectionFactory, RemoteTrackChanges, SdpKind};
pub use peer_error::PeerError;
pub use peer_link::{LinkRole, PeerLink};
pub use sdp_peer_connection::{SdpPeerConnection, SdpPeerConnectionFactory};
pub use signaling_state::SignalingState;

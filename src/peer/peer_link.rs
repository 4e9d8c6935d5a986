use std::collections::HashMap;

use crate::peer::{PeerConnection, SignalingState};
use crate::signaling::protocol::{TrackInfo, TrackKind, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    Offerer,
    Answerer,
}

/// One negotiated connection to a remote user.
pub struct PeerLink {
    remote: UserId,
    role: LinkRole,
    pub(crate) state: SignalingState,
    pub(crate) pc: Box<dyn PeerConnection>,
    /// Kinds the remote announced for its tracks, by track id.
    announced: HashMap<String, TrackKind>,
    /// A local change arrived while an offer was outstanding.
    pub(crate) renegotiate_pending: bool,
}

impl PeerLink {
    pub fn new(remote: impl Into<UserId>, role: LinkRole, pc: Box<dyn PeerConnection>) -> Self {
        Self {
            remote: remote.into(),
            role,
            state: SignalingState::New,
            pc,
            announced: HashMap::new(),
            renegotiate_pending: false,
        }
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn role(&self) -> LinkRole {
        self.role
    }

    pub fn state(&self) -> SignalingState {
        self.state
    }

    /// Every description lists all of the sender's tracks, so the latest
    /// announcement replaces the previous one. An empty list keeps it.
    pub(crate) fn remember_announcement(&mut self, tracks: &[TrackInfo]) {
        if tracks.is_empty() {
            return;
        }
        self.announced = tracks.iter().map(|t| (t.track_id.clone(), t.kind)).collect();
    }

    pub fn announced_kind(&self, track_id: &str) -> Option<TrackKind> {
        self.announced.get(track_id).copied()
    }
}

impl std::fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerLink")
            .field("remote", &self.remote)
            .field("role", &self.role)
            .field("state", &self.state)
            .field("renegotiate_pending", &self.renegotiate_pending)
            .finish_non_exhaustive()
    }
}

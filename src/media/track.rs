use crate::sdp::MediaKind;
use crate::signaling::protocol::{TrackInfo, TrackKind};

/// A captured track owned by this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    pub id: String,
    pub stream_id: String,
    pub label: String,
    pub kind: TrackKind,
    /// Disabled tracks stay attached but send silence/black.
    pub enabled: bool,
}

impl LocalTrack {
    pub fn new(
        id: impl Into<String>,
        stream_id: impl Into<String>,
        label: impl Into<String>,
        kind: TrackKind,
    ) -> Self {
        Self {
            id: id.into(),
            stream_id: stream_id.into(),
            label: label.into(),
            kind,
            enabled: true,
        }
    }

    pub fn media_kind(&self) -> MediaKind {
        if self.kind.is_video() {
            MediaKind::Video
        } else {
            MediaKind::Audio
        }
    }

    /// What gets announced to peers alongside offers and answers.
    pub fn info(&self) -> TrackInfo {
        TrackInfo {
            track_id: self.id.clone(),
            stream_id: self.stream_id.clone(),
            kind: self.kind,
        }
    }
}

/// A track a remote peer is sending us, as learned from its description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub stream_id: String,
    pub label: String,
    pub media: MediaKind,
}

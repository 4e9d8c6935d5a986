use std::collections::HashMap;
use std::fmt;

use crate::media::RemoteTrack;
use crate::sdp::MediaKind;
use crate::signaling::protocol::{TrackKind, UserId};

/// Where an inbound track is shown or played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaSlot {
    Voice,
    Camera,
    Screen,
}

impl fmt::Display for MediaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Voice => "voice",
            Self::Camera => "camera",
            Self::Screen => "screen",
        })
    }
}

impl From<TrackKind> for MediaSlot {
    fn from(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Audio => Self::Voice,
            TrackKind::Camera => Self::Camera,
            TrackKind::Screen => Self::Screen,
        }
    }
}

/// Classified media handles for one remote peer. A newer track replaces an
/// older one in the same slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerMedia {
    pub voice: Option<RemoteTrack>,
    pub camera: Option<RemoteTrack>,
    pub screen: Option<RemoteTrack>,
}

impl PeerMedia {
    pub fn slot(&self, slot: MediaSlot) -> Option<&RemoteTrack> {
        match slot {
            MediaSlot::Voice => self.voice.as_ref(),
            MediaSlot::Camera => self.camera.as_ref(),
            MediaSlot::Screen => self.screen.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: MediaSlot) -> &mut Option<RemoteTrack> {
        match slot {
            MediaSlot::Voice => &mut self.voice,
            MediaSlot::Camera => &mut self.camera,
            MediaSlot::Screen => &mut self.screen,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.voice.is_none() && self.camera.is_none() && self.screen.is_none()
    }
}

/// Hint substrings that mark a video track as screen capture when the sender
/// did not announce a kind.
fn looks_like_screen(track: &RemoteTrack) -> bool {
    track.stream_id.to_lowercase().contains("screen")
        || track.label.to_lowercase().contains("screen")
}

/// Assigns inbound tracks to per-peer voice/camera/screen slots.
#[derive(Debug, Default)]
pub struct StreamClassifier {
    peers: HashMap<UserId, PeerMedia>,
}

impl StreamClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a slot. An announced kind wins over sniffing, except that audio
    /// media is always voice.
    pub fn classify(track: &RemoteTrack, announced: Option<TrackKind>) -> MediaSlot {
        if track.media == MediaKind::Audio {
            return MediaSlot::Voice;
        }
        match announced {
            Some(TrackKind::Screen) => MediaSlot::Screen,
            Some(TrackKind::Camera) => MediaSlot::Camera,
            // audio announced for a video section: trust the media
            Some(TrackKind::Audio) | None if looks_like_screen(track) => MediaSlot::Screen,
            Some(TrackKind::Audio) | None => MediaSlot::Camera,
        }
    }

    /// Classify and store; returns the slot used.
    pub fn assign(
        &mut self,
        peer: &str,
        track: RemoteTrack,
        announced: Option<TrackKind>,
    ) -> MediaSlot {
        let slot = Self::classify(&track, announced);
        *self.peers.entry(peer.to_owned()).or_default().slot_mut(slot) = Some(track);
        slot
    }

    /// Forget one track; returns the slot it occupied.
    pub fn remove_track(&mut self, peer: &str, track_id: &str) -> Option<MediaSlot> {
        let media = self.peers.get_mut(peer)?;
        let slot = [MediaSlot::Voice, MediaSlot::Camera, MediaSlot::Screen]
            .into_iter()
            .find(|s| media.slot(*s).is_some_and(|t| t.id == track_id))?;
        *media.slot_mut(slot) = None;
        if media.is_empty() {
            self.peers.remove(peer);
        }
        Some(slot)
    }

    pub fn remove_peer(&mut self, peer: &str) -> Option<PeerMedia> {
        self.peers.remove(peer)
    }

    pub fn media_for(&self, peer: &str) -> Option<&PeerMedia> {
        self.peers.get(peer)
    }

    pub fn peers(&self) -> impl Iterator<Item = (&UserId, &PeerMedia)> {
        self.peers.iter()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn track(id: &str, stream: &str, label: &str, media: MediaKind) -> RemoteTrack {
        RemoteTrack {
            id: id.into(),
            stream_id: stream.into(),
            label: label.into(),
            media,
        }
    }

    #[test]
    fn audio_is_always_voice() {
        let t = track("a", "screen-1", "Screen audio", MediaKind::Audio);
        assert_eq!(StreamClassifier::classify(&t, None), MediaSlot::Voice);
        assert_eq!(
            StreamClassifier::classify(&t, Some(TrackKind::Screen)),
            MediaSlot::Voice
        );
    }

    #[test]
    fn untagged_video_falls_back_to_hints() {
        let cam = track("v1", "stream-1", "FaceTime HD", MediaKind::Video);
        let by_stream = track("v2", "screen-9", "x", MediaKind::Video);
        let by_label = track("v3", "s", "Entire SCREEN", MediaKind::Video);
        assert_eq!(StreamClassifier::classify(&cam, None), MediaSlot::Camera);
        assert_eq!(StreamClassifier::classify(&by_stream, None), MediaSlot::Screen);
        assert_eq!(StreamClassifier::classify(&by_label, None), MediaSlot::Screen);
    }

    #[test]
    fn announced_kind_beats_hints() {
        let misleading = track("v", "screen-1", "Screen 1", MediaKind::Video);
        assert_eq!(
            StreamClassifier::classify(&misleading, Some(TrackKind::Camera)),
            MediaSlot::Camera
        );
        let plain = track("v", "stream-1", "cam", MediaKind::Video);
        assert_eq!(
            StreamClassifier::classify(&plain, Some(TrackKind::Screen)),
            MediaSlot::Screen
        );
    }

    #[test]
    fn slots_fill_and_empty_per_peer() {
        let mut c = StreamClassifier::new();
        c.assign("bob", track("a", "s", "mic", MediaKind::Audio), None);
        c.assign("bob", track("v", "s", "cam", MediaKind::Video), None);
        let media = c.media_for("bob").unwrap();
        assert_eq!(media.voice.as_ref().unwrap().id, "a");
        assert_eq!(media.camera.as_ref().unwrap().id, "v");
        assert!(media.screen.is_none());

        assert_eq!(c.remove_track("bob", "v"), Some(MediaSlot::Camera));
        assert_eq!(c.remove_track("bob", "v"), None);
        assert_eq!(c.remove_track("bob", "a"), Some(MediaSlot::Voice));
        assert!(c.media_for("bob").is_none());
    }
}

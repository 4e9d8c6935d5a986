use std::collections::HashSet;
use std::sync::atomic::{AtomicU16, Ordering};

use rand::Rng;

use crate::media::{LocalTrack, RemoteTrack};
use crate::peer::{PeerConnection, PeerConnectionFactory, PeerError, RemoteTrackChanges, SdpKind};
use crate::sdp::{Attribute, Direction, MediaKind, MediaSection, SessionDescription};
use crate::signaling::protocol::IceCandidate;

const HOST_PRIORITY: u32 = 2_122_260_223;

/// Reference engine: real SDP text in and out, one m-section per local
/// track, a single host candidate per connection. No media flows.
#[derive(Debug)]
pub struct SdpPeerConnection {
    session_id: u64,
    session_version: u64,
    ice_ufrag: String,
    ice_pwd: String,
    host: (String, u16),
    /// Local tracks in attach order, each with the mid it was given.
    tracks: Vec<(String, LocalTrack)>,
    next_mid: u32,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    remote_offer_pending: bool,
    remote_tracks: Vec<RemoteTrack>,
    applied_candidates: Vec<IceCandidate>,
    gathered: Vec<IceCandidate>,
    candidate_gathered: bool,
    closed: bool,
}

fn random_token(len: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

impl SdpPeerConnection {
    pub fn new(candidate_ip: impl Into<String>, candidate_port: u16) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            // keep it positive as a signed 63-bit value, like browsers do
            session_id: rng.r#gen::<u64>() >> 1,
            session_version: 0,
            ice_ufrag: random_token(8),
            ice_pwd: random_token(24),
            host: (candidate_ip.into(), candidate_port),
            tracks: Vec::new(),
            next_mid: 0,
            local: None,
            remote: None,
            remote_offer_pending: false,
            remote_tracks: Vec::new(),
            applied_candidates: Vec::new(),
            gathered: Vec::new(),
            candidate_gathered: false,
            closed: false,
        }
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local.as_ref()
    }

    pub fn local_track_ids(&self) -> Vec<&str> {
        self.tracks.iter().map(|(_, t)| t.id.as_str()).collect()
    }

    fn ensure_open(&self) -> Result<(), PeerError> {
        if self.closed {
            Err(PeerError::Closed)
        } else {
            Ok(())
        }
    }

    fn build_description(&mut self) -> SessionDescription {
        self.session_version += 1;
        let mut desc = SessionDescription::new(self.session_id, self.session_version);
        desc.ice_ufrag = Some(self.ice_ufrag.clone());
        desc.ice_pwd = Some(self.ice_pwd.clone());
        desc.attrs.push(Attribute::new("msid-semantic", Some(" WMS".to_owned())));

        for (mid, track) in &self.tracks {
            let fmts = match track.media_kind() {
                MediaKind::Audio => vec!["111".to_owned()],
                _ => vec!["96".to_owned()],
            };
            let mut m = MediaSection::new(track.media_kind(), fmts);
            m.mid = Some(mid.clone());
            // disabled tracks keep their section; they send silence/black
            m.direction = Direction::SendRecv;
            m.msid = Some((track.stream_id.clone(), track.id.clone()));
            m.label = Some(track.label.clone());
            m.attrs.push(match m.kind {
                MediaKind::Audio => Attribute::new("rtpmap", Some("111 opus/48000/2".to_owned())),
                _ => Attribute::new("rtpmap", Some("96 VP8/90000".to_owned())),
            });
            desc.bundle.push(mid.clone());
            desc.media.push(m);
        }
        desc
    }

    fn gather(&mut self) {
        if self.candidate_gathered {
            return;
        }
        self.candidate_gathered = true;
        let (ip, port) = &self.host;
        self.gathered.push(IceCandidate {
            candidate: format!("candidate:1 1 UDP {HOST_PRIORITY} {ip} {port} typ host"),
            sdp_mid: self.tracks.first().map(|(mid, _)| mid.clone()),
            sdp_mline_index: Some(0),
        });
    }

    fn install_local(&mut self) -> String {
        let desc = self.build_description();
        let text = desc.to_string();
        self.local = Some(desc);
        self.gather();
        text
    }
}

/// What a remote description says the far side is sending.
fn sending_tracks(desc: &SessionDescription) -> Vec<RemoteTrack> {
    desc.media
        .iter()
        .filter(|m| m.direction.sends())
        .filter_map(|m| {
            let (stream, track) = m.msid.as_ref()?;
            Some(RemoteTrack {
                id: track.clone(),
                stream_id: stream.clone(),
                label: m.label.clone().unwrap_or_else(|| track.clone()),
                media: m.kind.clone(),
            })
        })
        .collect()
}

fn validate_candidate(c: &IceCandidate) -> Result<(), PeerError> {
    let body = c
        .candidate
        .strip_prefix("candidate:")
        .ok_or_else(|| PeerError::InvalidCandidate(c.candidate.clone()))?;
    // foundation component transport priority address port "typ" type
    if body.split_whitespace().count() < 8 {
        return Err(PeerError::InvalidCandidate(c.candidate.clone()));
    }
    Ok(())
}

impl PeerConnection for SdpPeerConnection {
    fn add_track(&mut self, track: &LocalTrack) -> Result<(), PeerError> {
        self.ensure_open()?;
        if self.tracks.iter().any(|(_, t)| t.id == track.id) {
            return Ok(());
        }
        let mid = self.next_mid.to_string();
        self.next_mid += 1;
        self.tracks.push((mid, track.clone()));
        Ok(())
    }

    fn remove_track(&mut self, track_id: &str) -> Result<(), PeerError> {
        self.ensure_open()?;
        let before = self.tracks.len();
        self.tracks.retain(|(_, t)| t.id != track_id);
        if self.tracks.len() == before {
            return Err(PeerError::UnknownTrack(track_id.to_owned()));
        }
        Ok(())
    }

    fn set_track_enabled(&mut self, track_id: &str, enabled: bool) -> Result<(), PeerError> {
        self.ensure_open()?;
        let (_, track) = self
            .tracks
            .iter_mut()
            .find(|(_, t)| t.id == track_id)
            .ok_or_else(|| PeerError::UnknownTrack(track_id.to_owned()))?;
        track.enabled = enabled;
        Ok(())
    }

    fn create_offer(&mut self) -> Result<String, PeerError> {
        self.ensure_open()?;
        Ok(self.install_local())
    }

    fn create_answer(&mut self) -> Result<String, PeerError> {
        self.ensure_open()?;
        if !self.remote_offer_pending {
            return Err(PeerError::NoRemoteDescription);
        }
        self.remote_offer_pending = false;
        Ok(self.install_local())
    }

    fn set_remote_description(
        &mut self,
        kind: SdpKind,
        sdp: &str,
    ) -> Result<RemoteTrackChanges, PeerError> {
        self.ensure_open()?;
        let desc: SessionDescription = sdp.parse()?;
        let now = sending_tracks(&desc);

        let old_ids: HashSet<&str> = self.remote_tracks.iter().map(|t| t.id.as_str()).collect();
        let new_ids: HashSet<&str> = now.iter().map(|t| t.id.as_str()).collect();
        let changes = RemoteTrackChanges {
            added: now
                .iter()
                .filter(|t| !old_ids.contains(t.id.as_str()))
                .cloned()
                .collect(),
            removed: self
                .remote_tracks
                .iter()
                .filter(|t| !new_ids.contains(t.id.as_str()))
                .map(|t| t.id.clone())
                .collect(),
        };

        self.remote_tracks = now;
        self.remote = Some(desc);
        self.remote_offer_pending = kind == SdpKind::Offer;
        Ok(changes)
    }

    fn has_remote_description(&self) -> bool {
        self.remote.is_some()
    }

    fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<(), PeerError> {
        self.ensure_open()?;
        if self.remote.is_none() {
            return Err(PeerError::NoRemoteDescription);
        }
        validate_candidate(candidate)?;
        self.applied_candidates.push(candidate.clone());
        Ok(())
    }

    fn remote_candidates(&self) -> Vec<IceCandidate> {
        self.applied_candidates.clone()
    }

    fn take_local_candidates(&mut self) -> Vec<IceCandidate> {
        std::mem::take(&mut self.gathered)
    }

    fn remote_tracks(&self) -> Vec<RemoteTrack> {
        self.remote_tracks.clone()
    }

    fn close(&mut self) {
        self.closed = true;
        self.tracks.clear();
        self.gathered.clear();
    }
}

/// Hands out `SdpPeerConnection`s with distinct host candidate ports.
#[derive(Debug)]
pub struct SdpPeerConnectionFactory {
    candidate_ip: String,
    next_port: AtomicU16,
}

impl SdpPeerConnectionFactory {
    pub fn new(candidate_ip: impl Into<String>) -> Self {
        Self::with_base_port(candidate_ip, 50_000)
    }

    pub fn with_base_port(candidate_ip: impl Into<String>, base_port: u16) -> Self {
        Self {
            candidate_ip: candidate_ip.into(),
            next_port: AtomicU16::new(base_port),
        }
    }
}

impl PeerConnectionFactory for SdpPeerConnectionFactory {
    fn create(&self, _remote_user: &str) -> Box<dyn PeerConnection> {
        let port = self.next_port.fetch_add(1, Ordering::Relaxed);
        Box::new(SdpPeerConnection::new(self.candidate_ip.clone(), port))
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use crate::log::LogSink;
use crate::media::{LocalTrack, RemoteTrack};
use crate::peer::{
    CandidateQueue, LinkRole, MediaSlot, PeerConnectionFactory, PeerError, PeerLink,
    RemoteTrackChanges, SdpKind, SignalingState, StreamClassifier,
};
use crate::signaling::protocol::{IceCandidate, RoomId, SignalingMsg, TrackInfo, UserId};
use crate::signaling_client::SignalingChannel;
use crate::{sink_debug, sink_info, sink_warn};

/// Something the UI layer may want to know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerUpdate {
    LinkState {
        peer: UserId,
        state: SignalingState,
    },
    TrackAdded {
        peer: UserId,
        slot: MediaSlot,
        track: RemoteTrack,
    },
    TrackRemoved {
        peer: UserId,
        slot: MediaSlot,
        track_id: String,
    },
    LinkClosed {
        peer: UserId,
    },
}

/// Owns every peer link of one session (a voice room or a private call).
///
/// All entry points run on the client's single event thread, so the state
/// guards below are the only synchronisation the links need.
pub struct PeerOrchestrator {
    local_user: UserId,
    /// Room the offers/answers/candidates are scoped to, `None` for calls.
    scope: Option<RoomId>,
    links: HashMap<UserId, PeerLink>,
    queues: HashMap<UserId, CandidateQueue>,
    local_tracks: Vec<LocalTrack>,
    classifier: StreamClassifier,
    factory: Arc<dyn PeerConnectionFactory>,
    channel: Arc<dyn SignalingChannel>,
    log: Arc<dyn LogSink>,
    updates: Vec<PeerUpdate>,
}

impl PeerOrchestrator {
    pub fn new(
        local_user: impl Into<UserId>,
        scope: Option<RoomId>,
        factory: Arc<dyn PeerConnectionFactory>,
        channel: Arc<dyn SignalingChannel>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            local_user: local_user.into(),
            scope,
            links: HashMap::new(),
            queues: HashMap::new(),
            local_tracks: Vec::new(),
            classifier: StreamClassifier::new(),
            factory,
            channel,
            log,
            updates: Vec::new(),
        }
    }

    pub fn local_user(&self) -> &str {
        &self.local_user
    }

    pub fn scope(&self) -> Option<&RoomId> {
        self.scope.as_ref()
    }

    pub fn link_state(&self, remote: &str) -> Option<SignalingState> {
        self.links.get(remote).map(PeerLink::state)
    }

    pub fn link(&self, remote: &str) -> Option<&PeerLink> {
        self.links.get(remote)
    }

    pub fn peers(&self) -> Vec<UserId> {
        let mut v: Vec<_> = self.links.keys().cloned().collect();
        v.sort();
        v
    }

    pub fn classifier(&self) -> &StreamClassifier {
        &self.classifier
    }

    pub fn local_tracks(&self) -> &[LocalTrack] {
        &self.local_tracks
    }

    pub fn queued_candidates(&self, remote: &str) -> usize {
        self.queues.get(remote).map_or(0, CandidateQueue::len)
    }

    /// Candidates the engine for `remote` has applied, in order.
    pub fn applied_candidates(&self, remote: &str) -> Vec<IceCandidate> {
        self.links
            .get(remote)
            .map(|l| l.pc.remote_candidates())
            .unwrap_or_default()
    }

    pub fn take_updates(&mut self) -> Vec<PeerUpdate> {
        std::mem::take(&mut self.updates)
    }

    // ---- local media ------------------------------------------------------

    /// Tracks attached to links created from now on. Does not renegotiate.
    pub fn set_local_tracks(&mut self, tracks: Vec<LocalTrack>) {
        self.local_tracks = tracks;
    }

    /// Attach a new local track to every link and renegotiate.
    pub fn add_local_track(&mut self, track: LocalTrack) -> Result<(), PeerError> {
        for link in self.links.values_mut() {
            link.pc.add_track(&track)?;
        }
        self.local_tracks.push(track);
        self.renegotiate_all()
    }

    /// Detach a local track from every link and renegotiate. Returns the
    /// removed track so the caller can release it.
    pub fn remove_local_track(&mut self, track_id: &str) -> Result<LocalTrack, PeerError> {
        let pos = self
            .local_tracks
            .iter()
            .position(|t| t.id == track_id)
            .ok_or_else(|| PeerError::UnknownTrack(track_id.to_owned()))?;
        let track = self.local_tracks.remove(pos);
        for link in self.links.values_mut() {
            match link.pc.remove_track(track_id) {
                Ok(()) | Err(PeerError::UnknownTrack(_)) => {}
                Err(e) => return Err(e),
            }
        }
        self.renegotiate_all()?;
        Ok(track)
    }

    /// Mute/unmute style switch; no renegotiation.
    pub fn set_track_enabled(&mut self, track_id: &str, enabled: bool) -> Result<(), PeerError> {
        let track = self
            .local_tracks
            .iter_mut()
            .find(|t| t.id == track_id)
            .ok_or_else(|| PeerError::UnknownTrack(track_id.to_owned()))?;
        track.enabled = enabled;
        for link in self.links.values_mut() {
            link.pc.set_track_enabled(track_id, enabled)?;
        }
        Ok(())
    }

    /// Track list sent alongside every description.
    pub fn track_announcement(&self) -> Vec<TrackInfo> {
        self.local_tracks.iter().map(LocalTrack::info).collect()
    }

    // ---- negotiation ------------------------------------------------------

    fn insert_link(&mut self, remote: &str, role: LinkRole) -> Result<(), PeerError> {
        let mut pc = self.factory.create(remote);
        for t in &self.local_tracks {
            pc.add_track(t)?;
        }
        self.links
            .insert(remote.to_owned(), PeerLink::new(remote, role, pc));
        sink_debug!(self.log, "[peer] link to {} created as {:?}", remote, role);
        Ok(())
    }

    fn set_state(&mut self, remote: &str, state: SignalingState) {
        if let Some(link) = self.links.get_mut(remote) {
            link.state = state;
            self.updates.push(PeerUpdate::LinkState {
                peer: remote.to_owned(),
                state,
            });
        }
    }

    /// Create a link as offerer and install an offer without sending it.
    /// Used where the offer rides inside another message (a call request).
    pub fn open_offer(&mut self, remote: &str) -> Result<String, PeerError> {
        if let Some(state) = self.link_state(remote) {
            return Err(PeerError::InvalidState {
                op: "create-offer",
                state,
            });
        }
        self.insert_link(remote, LinkRole::Offerer)?;
        let offer = match self.links.get_mut(remote) {
            Some(link) => link.pc.create_offer(),
            None => return Err(PeerError::UnknownPeer(remote.to_owned())),
        };
        match offer {
            Ok(sdp) => {
                self.set_state(remote, SignalingState::HaveLocalOffer);
                Ok(sdp)
            }
            Err(e) => {
                self.links.remove(remote);
                Err(e)
            }
        }
    }

    /// Create a link as offerer and send the offer.
    pub fn create_as_offerer(&mut self, remote: &str) -> Result<(), PeerError> {
        let sdp = self.open_offer(remote)?;
        self.channel.send(SignalingMsg::Offer {
            from: self.local_user.clone(),
            to: remote.to_owned(),
            room_id: self.scope.clone(),
            sdp,
            tracks: self.track_announcement(),
        })?;
        sink_info!(self.log, "[peer] offer sent to {}", remote);
        self.send_local_candidates(remote)
    }

    /// Apply a remote offer and produce the answer without sending it.
    /// Creates the link as answerer if there is none.
    pub fn accept_offer(
        &mut self,
        remote: &str,
        sdp: &str,
        tracks: &[TrackInfo],
    ) -> Result<String, PeerError> {
        let fresh = match self.link_state(remote) {
            None => true,
            Some(SignalingState::Stable) => false,
            Some(state) => {
                return Err(PeerError::InvalidState {
                    op: "remote-offer",
                    state,
                });
            }
        };
        if fresh {
            self.insert_link(remote, LinkRole::Answerer)?;
        }
        match self.answer_inner(remote, sdp, tracks) {
            Err(e) if fresh => {
                self.links.remove(remote);
                Err(e)
            }
            other => other,
        }
    }

    fn answer_inner(
        &mut self,
        remote: &str,
        sdp: &str,
        tracks: &[TrackInfo],
    ) -> Result<String, PeerError> {
        let link = self
            .links
            .get_mut(remote)
            .ok_or_else(|| PeerError::UnknownPeer(remote.to_owned()))?;
        let changes = link.pc.set_remote_description(SdpKind::Offer, sdp)?;
        link.remember_announcement(tracks);
        self.set_state(remote, SignalingState::HaveRemoteOffer);
        self.apply_track_changes(remote, changes);

        let answer = match self.links.get_mut(remote) {
            Some(link) => link.pc.create_answer()?,
            None => return Err(PeerError::UnknownPeer(remote.to_owned())),
        };
        self.set_state(remote, SignalingState::Stable);
        self.flush_queue(remote);
        Ok(answer)
    }

    /// Handle an `offer` from `remote`: answer it, or ignore it if we have an
    /// offer of our own outstanding.
    pub fn on_remote_offer(
        &mut self,
        remote: &str,
        sdp: &str,
        tracks: &[TrackInfo],
    ) -> Result<(), PeerError> {
        let answer = match self.accept_offer(remote, sdp, tracks) {
            Ok(answer) => answer,
            Err(PeerError::InvalidState { state, .. }) => {
                sink_warn!(
                    self.log,
                    "[peer] ignoring offer from {} while {}",
                    remote,
                    state
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        self.channel.send(SignalingMsg::Answer {
            from: self.local_user.clone(),
            to: remote.to_owned(),
            room_id: self.scope.clone(),
            sdp: answer,
            tracks: self.track_announcement(),
        })?;
        sink_info!(self.log, "[peer] answered offer from {}", remote);
        self.send_local_candidates(remote)
    }

    /// Handle an answer (plain `answer` or the sdp of a `call-accept`).
    pub fn on_remote_answer(
        &mut self,
        remote: &str,
        sdp: &str,
        tracks: &[TrackInfo],
    ) -> Result<(), PeerError> {
        let Some(link) = self.links.get_mut(remote) else {
            sink_warn!(self.log, "[peer] answer from {} without a link", remote);
            return Ok(());
        };
        if link.state != SignalingState::HaveLocalOffer {
            sink_warn!(
                self.log,
                "[peer] ignoring answer from {} while {}",
                remote,
                link.state
            );
            return Ok(());
        }
        let changes = link.pc.set_remote_description(SdpKind::Answer, sdp)?;
        link.remember_announcement(tracks);
        let pending = std::mem::take(&mut link.renegotiate_pending);

        self.set_state(remote, SignalingState::Stable);
        self.apply_track_changes(remote, changes);
        self.flush_queue(remote);
        if pending {
            sink_debug!(self.log, "[peer] running deferred renegotiation with {}", remote);
            self.renegotiate(remote)?;
        }
        Ok(())
    }

    /// Apply now if the remote description is set, otherwise queue.
    pub fn on_remote_candidate(&mut self, remote: &str, candidate: IceCandidate) {
        if let Some(link) = self.links.get_mut(remote) {
            if link.pc.has_remote_description() {
                if let Err(e) = link.pc.add_ice_candidate(&candidate) {
                    sink_warn!(self.log, "[peer] candidate from {} rejected: {}", remote, e);
                }
                return;
            }
        }
        let queue = self.queues.entry(remote.to_owned()).or_default();
        if let Err(dropped) = queue.push(candidate) {
            sink_warn!(
                self.log,
                "[peer] candidate queue for {} full, dropping {}",
                remote,
                dropped.candidate
            );
        }
    }

    fn flush_queue(&mut self, remote: &str) {
        let Some(mut queue) = self.queues.remove(remote) else {
            return;
        };
        let Some(link) = self.links.get_mut(remote) else {
            return;
        };
        let pending = queue.drain();
        if !pending.is_empty() {
            sink_debug!(
                self.log,
                "[peer] applying {} queued candidates from {}",
                pending.len(),
                remote
            );
        }
        for c in pending {
            if let Err(e) = link.pc.add_ice_candidate(&c) {
                sink_warn!(self.log, "[peer] queued candidate from {} rejected: {}", remote, e);
            }
        }
    }

    /// Trickle whatever the engine gathered for `remote`.
    pub fn send_local_candidates(&mut self, remote: &str) -> Result<(), PeerError> {
        let Some(link) = self.links.get_mut(remote) else {
            return Ok(());
        };
        for candidate in link.pc.take_local_candidates() {
            self.channel.send(SignalingMsg::IceCandidate {
                from: self.local_user.clone(),
                to: remote.to_owned(),
                room_id: self.scope.clone(),
                candidate,
            })?;
        }
        Ok(())
    }

    fn apply_track_changes(&mut self, remote: &str, changes: RemoteTrackChanges) {
        for track_id in changes.removed {
            if let Some(slot) = self.classifier.remove_track(remote, &track_id) {
                self.updates.push(PeerUpdate::TrackRemoved {
                    peer: remote.to_owned(),
                    slot,
                    track_id,
                });
            }
        }
        let link = self.links.get(remote);
        for track in changes.added {
            let announced = link.and_then(|l| l.announced_kind(&track.id));
            let slot = self.classifier.assign(remote, track.clone(), announced);
            sink_info!(
                self.log,
                "[peer] {} track {} from {} classified as {}",
                track.media,
                track.id,
                remote,
                slot
            );
            self.updates.push(PeerUpdate::TrackAdded {
                peer: remote.to_owned(),
                slot,
                track,
            });
        }
    }

    /// Send a fresh offer on a stable link. With an offer already
    /// outstanding, the request is remembered and issued after the answer.
    pub fn renegotiate(&mut self, remote: &str) -> Result<(), PeerError> {
        let link = self
            .links
            .get_mut(remote)
            .ok_or_else(|| PeerError::UnknownPeer(remote.to_owned()))?;
        match link.state {
            SignalingState::Stable => {}
            SignalingState::HaveLocalOffer | SignalingState::HaveRemoteOffer => {
                link.renegotiate_pending = true;
                return Ok(());
            }
            SignalingState::New | SignalingState::Closed => return Ok(()),
        }
        let sdp = link.pc.create_offer()?;
        self.set_state(remote, SignalingState::HaveLocalOffer);
        self.channel.send(SignalingMsg::Offer {
            from: self.local_user.clone(),
            to: remote.to_owned(),
            room_id: self.scope.clone(),
            sdp,
            tracks: self.track_announcement(),
        })?;
        sink_debug!(self.log, "[peer] renegotiating with {}", remote);
        Ok(())
    }

    pub fn renegotiate_all(&mut self) -> Result<(), PeerError> {
        for remote in self.peers() {
            self.renegotiate(&remote)?;
        }
        Ok(())
    }

    // ---- teardown ---------------------------------------------------------

    /// Close and forget the link to `remote` together with its queue and
    /// classified media.
    pub fn close(&mut self, remote: &str) {
        self.queues.remove(remote);
        self.classifier.remove_peer(remote);
        if let Some(mut link) = self.links.remove(remote) {
            link.pc.close();
            link.state = SignalingState::Closed;
            self.updates.push(PeerUpdate::LinkState {
                peer: remote.to_owned(),
                state: SignalingState::Closed,
            });
            self.updates.push(PeerUpdate::LinkClosed {
                peer: remote.to_owned(),
            });
            sink_info!(self.log, "[peer] link to {} closed", remote);
        }
    }

    pub fn close_all(&mut self) {
        for remote in self.peers() {
            self.close(&remote);
        }
        self.queues.clear();
        self.classifier.clear();
    }

    /// Drop buffered candidates for a peer we will not link with.
    pub fn discard_queue(&mut self, remote: &str) {
        self.queues.remove(remote);
    }

    /// Hand the local tracks back, e.g. for release on session end.
    pub fn take_local_tracks(&mut self) -> Vec<LocalTrack> {
        std::mem::take(&mut self.local_tracks)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::NoopLogSink;
    use crate::media::TrackKind;
    use crate::peer::SdpPeerConnectionFactory;
    use crate::signaling_client::RecordingChannel;

    struct Side {
        orch: PeerOrchestrator,
        chan: Arc<RecordingChannel>,
    }

    fn side(user: &str, port: u16) -> Side {
        let chan = Arc::new(RecordingChannel::new());
        let mut orch = PeerOrchestrator::new(
            user,
            Some("r1".into()),
            Arc::new(SdpPeerConnectionFactory::with_base_port("127.0.0.1", port)),
            chan.clone(),
            Arc::new(NoopLogSink),
        );
        orch.set_local_tracks(vec![LocalTrack::new(
            format!("audio-{user}"),
            format!("stream-{user}"),
            "mic",
            TrackKind::Audio,
        )]);
        Side { orch, chan }
    }

    /// Deliver everything `from` sent to `to`.
    fn pump(from: &Side, to: &mut Side) {
        for msg in from.chan.take() {
            match msg {
                SignalingMsg::Offer { from, sdp, tracks, .. } => {
                    to.orch.on_remote_offer(&from, &sdp, &tracks).unwrap()
                }
                SignalingMsg::Answer { from, sdp, tracks, .. } => {
                    to.orch.on_remote_answer(&from, &sdp, &tracks).unwrap()
                }
                SignalingMsg::IceCandidate { from, candidate, .. } => {
                    to.orch.on_remote_candidate(&from, candidate)
                }
                other => panic!("unexpected {}", other.name()),
            }
        }
    }

    fn offers_in(msgs: &[SignalingMsg]) -> usize {
        msgs.iter()
            .filter(|m| matches!(m, SignalingMsg::Offer { .. }))
            .count()
    }

    #[test]
    fn offer_answer_reaches_stable_on_both_sides() {
        let mut a = side("alice", 5000);
        let mut b = side("bob", 6000);

        a.orch.create_as_offerer("bob").unwrap();
        assert_eq!(a.orch.link_state("bob"), Some(SignalingState::HaveLocalOffer));
        pump(&a, &mut b);
        assert_eq!(b.orch.link_state("alice"), Some(SignalingState::Stable));
        assert_eq!(b.orch.link("alice").unwrap().role(), LinkRole::Answerer);
        pump(&b, &mut a);
        assert_eq!(a.orch.link_state("bob"), Some(SignalingState::Stable));

        let bob_media = a.orch.classifier().media_for("bob").unwrap();
        assert_eq!(bob_media.voice.as_ref().unwrap().id, "audio-bob");
        assert_eq!(b.orch.applied_candidates("alice").len(), 1);
    }

    #[test]
    fn early_candidates_are_queued_then_applied_once_in_order() {
        let mut a = side("alice", 5000);
        let mut b = side("bob", 6000);
        a.orch.create_as_offerer("bob").unwrap();
        let mut msgs = a.chan.take();
        let offer = msgs.remove(0);

        let early: Vec<_> = (0..3)
            .map(|i| {
                IceCandidate::new(format!("candidate:{i} 1 UDP 1 10.0.0.{i} 9 typ host"))
            })
            .collect();
        for c in &early {
            b.orch.on_remote_candidate("alice", c.clone());
        }
        assert_eq!(b.orch.queued_candidates("alice"), 3);

        let SignalingMsg::Offer { sdp, tracks, .. } = offer else {
            panic!("expected offer");
        };
        b.orch.on_remote_offer("alice", &sdp, &tracks).unwrap();
        assert_eq!(b.orch.queued_candidates("alice"), 0);
        assert_eq!(b.orch.applied_candidates("alice"), early);

        // later candidates go straight to the engine
        b.orch
            .on_remote_candidate("alice", IceCandidate::new("candidate:9 1 UDP 1 h 9 typ host"));
        assert_eq!(b.orch.applied_candidates("alice").len(), 4);
    }

    #[test]
    fn offer_during_own_offer_is_ignored() {
        let mut a = side("alice", 5000);
        let mut b = side("bob", 6000);
        a.orch.create_as_offerer("bob").unwrap();
        b.orch.create_as_offerer("alice").unwrap();
        a.chan.take();
        pump(&b, &mut a);
        assert_eq!(a.orch.link_state("bob"), Some(SignalingState::HaveLocalOffer));
        assert!(a.chan.take().is_empty());
    }

    #[test]
    fn stray_answer_is_ignored() {
        let mut a = side("alice", 5000);
        a.orch
            .on_remote_answer("bob", "v=0\r\no=- 1 1 IN IP4 h\r\ns=-\r\n", &[])
            .unwrap();
        assert!(a.orch.link_state("bob").is_none());
    }

    #[test]
    fn camera_renegotiation_adds_one_video_track_and_keeps_audio() {
        let mut a = side("alice", 5000);
        let mut b = side("bob", 6000);
        a.orch.create_as_offerer("bob").unwrap();
        pump(&a, &mut b);
        pump(&b, &mut a);
        b.orch.take_updates();

        let cam = LocalTrack::new("camera-alice", "stream-alice", "cam", TrackKind::Camera);
        a.orch.add_local_track(cam).unwrap();
        assert_eq!(a.orch.link_state("bob"), Some(SignalingState::HaveLocalOffer));
        pump(&a, &mut b);
        pump(&b, &mut a);
        assert_eq!(a.orch.link_state("bob"), Some(SignalingState::Stable));

        let added: Vec<_> = b
            .orch
            .take_updates()
            .into_iter()
            .filter_map(|u| match u {
                PeerUpdate::TrackAdded { slot, track, .. } => Some((slot, track.id)),
                _ => None,
            })
            .collect();
        assert_eq!(added, vec![(MediaSlot::Camera, "camera-alice".to_owned())]);
        let media = b.orch.classifier().media_for("alice").unwrap();
        assert_eq!(media.voice.as_ref().unwrap().id, "audio-alice");
    }

    #[test]
    fn renegotiation_while_offering_is_deferred() {
        let mut a = side("alice", 5000);
        let mut b = side("bob", 6000);
        a.orch.create_as_offerer("bob").unwrap();
        let screen = LocalTrack::new("display-1", "screen-1", "Screen 1", TrackKind::Screen);
        a.orch.add_local_track(screen).unwrap();
        // still just the one offer in flight
        assert_eq!(offers_in(&a.chan.sent()), 1);

        pump(&a, &mut b);
        pump(&b, &mut a);
        // answer arrived: the deferred offer goes out now
        assert_eq!(a.orch.link_state("bob"), Some(SignalingState::HaveLocalOffer));
        assert_eq!(offers_in(&a.chan.sent()), 1);
        pump(&a, &mut b);
        pump(&b, &mut a);
        assert_eq!(a.orch.link_state("bob"), Some(SignalingState::Stable));
        let media = b.orch.classifier().media_for("alice").unwrap();
        assert_eq!(media.screen.as_ref().unwrap().id, "display-1");
    }

    #[test]
    fn close_discards_link_queue_and_media() {
        let mut a = side("alice", 5000);
        let mut b = side("bob", 6000);
        a.orch.create_as_offerer("bob").unwrap();
        pump(&a, &mut b);
        b.orch.on_remote_candidate("carol", IceCandidate::new("candidate:x"));

        b.orch.close("alice");
        b.orch.discard_queue("carol");
        assert!(b.orch.link_state("alice").is_none());
        assert!(b.orch.classifier().media_for("alice").is_none());
        assert_eq!(b.orch.queued_candidates("carol"), 0);
        assert!(
            b.orch
                .take_updates()
                .contains(&PeerUpdate::LinkClosed { peer: "alice".into() })
        );
    }

    #[test]
    fn bad_remote_offer_leaves_no_link_behind() {
        let mut b = side("bob", 6000);
        assert!(b.orch.on_remote_offer("alice", "garbage", &[]).is_err());
        assert!(b.orch.link_state("alice").is_none());
    }
}

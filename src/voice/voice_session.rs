use std::sync::Arc;

use crate::log::LogSink;
use crate::media::{MediaDevices, TrackKind, acquire_video};
use crate::peer::{PeerConnectionFactory, PeerOrchestrator, PeerUpdate};
use crate::signaling::protocol::{IceCandidate, Member, RoomId, SignalingMsg, TrackInfo, UserId};
use crate::signaling_client::SignalingChannel;
use crate::voice::VoiceError;
use crate::{sink_info, sink_warn};

/// Local view of the voice room, as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceState {
    pub room_id: Option<RoomId>,
    /// The relay accepted the join and sent the roster.
    pub joined: bool,
    pub muted: bool,
    pub deafened: bool,
    pub camera: bool,
    pub screen: bool,
    pub whisper_target: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    Joined { room_id: RoomId, roster: Vec<Member> },
    JoinRefused { room_id: RoomId, code: u16 },
    PeerJoined { room_id: RoomId, member: Member },
    PeerLeft { room_id: RoomId, member: Member },
    Whisper { from: UserId, target: Option<UserId> },
    Left { room_id: RoomId },
    State(VoiceState),
    Media(PeerUpdate),
}

/// One voice room at a time. The member already in the room offers to each
/// newcomer; the newcomer answers.
pub struct GroupVoiceSession {
    local: Member,
    state: VoiceState,
    roster: Vec<Member>,
    /// Present while in a room; scoped to it.
    peers: Option<PeerOrchestrator>,
    muted_before_deafen: bool,
    devices: Arc<dyn MediaDevices>,
    factory: Arc<dyn PeerConnectionFactory>,
    channel: Arc<dyn SignalingChannel>,
    log: Arc<dyn LogSink>,
    events: Vec<VoiceEvent>,
}

impl GroupVoiceSession {
    pub fn new(
        local: Member,
        devices: Arc<dyn MediaDevices>,
        factory: Arc<dyn PeerConnectionFactory>,
        channel: Arc<dyn SignalingChannel>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            local,
            state: VoiceState::default(),
            roster: Vec::new(),
            peers: None,
            muted_before_deafen: false,
            devices,
            factory,
            channel,
            log,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &VoiceState {
        &self.state
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        self.state.room_id.as_ref()
    }

    pub fn roster(&self) -> &[Member] {
        &self.roster
    }

    pub fn peers(&self) -> Option<&PeerOrchestrator> {
        self.peers.as_ref()
    }

    pub fn take_events(&mut self) -> Vec<VoiceEvent> {
        self.collect_media();
        std::mem::take(&mut self.events)
    }

    fn collect_media(&mut self) {
        if let Some(peers) = self.peers.as_mut() {
            self.events
                .extend(peers.take_updates().into_iter().map(VoiceEvent::Media));
        }
    }

    fn publish_state(&mut self) {
        self.collect_media();
        self.events.push(VoiceEvent::State(self.state.clone()));
    }

    fn in_room(&self, room_id: &str) -> bool {
        self.state.room_id.as_deref() == Some(room_id)
    }

    fn peers_mut(&mut self) -> Result<&mut PeerOrchestrator, VoiceError> {
        self.peers.as_mut().ok_or(VoiceError::NotInRoom)
    }

    // ---- local actions ----------------------------------------------------

    /// Capture audio (and camera if asked), then ask the relay to join.
    ///
    /// # Errors
    /// Already in a room, capture refused, or the channel is gone. Nothing
    /// is left behind on failure.
    pub fn join(&mut self, room_id: &str, with_video: bool) -> Result<(), VoiceError> {
        if let Some(current) = &self.state.room_id {
            return Err(VoiceError::AlreadyInRoom(current.clone()));
        }
        if room_id.is_empty() {
            return Err(VoiceError::EmptyRoomId);
        }
        let tracks = self.devices.acquire_user_media(true, with_video)?;

        if let Err(e) = self.channel.send(SignalingMsg::JoinRoom {
            room_id: room_id.to_owned(),
        }) {
            for t in &tracks {
                self.devices.release(t);
            }
            return Err(e.into());
        }

        let mut peers = PeerOrchestrator::new(
            self.local.user_id.clone(),
            Some(room_id.to_owned()),
            Arc::clone(&self.factory),
            Arc::clone(&self.channel),
            Arc::clone(&self.log),
        );
        peers.set_local_tracks(tracks);
        self.peers = Some(peers);
        self.state = VoiceState {
            room_id: Some(room_id.to_owned()),
            camera: with_video,
            ..VoiceState::default()
        };
        sink_info!(self.log, "[voice] joining {}", room_id);
        self.publish_state();
        Ok(())
    }

    /// Close every link, stop capture and tell the relay.
    pub fn leave(&mut self) -> Result<(), VoiceError> {
        let room_id = self.state.room_id.clone().ok_or(VoiceError::NotInRoom)?;
        self.teardown();
        self.channel.send(SignalingMsg::LeaveRoom {
            room_id: room_id.clone(),
        })?;
        sink_info!(self.log, "[voice] left {}", room_id);
        Ok(())
    }

    fn teardown(&mut self) {
        let room_id = self.state.room_id.take();
        if let Some(mut peers) = self.peers.take() {
            peers.close_all();
            self.events
                .extend(peers.take_updates().into_iter().map(VoiceEvent::Media));
            for t in peers.take_local_tracks() {
                self.devices.release(&t);
            }
        }
        self.roster.clear();
        self.state = VoiceState::default();
        self.muted_before_deafen = false;
        if let Some(room_id) = room_id {
            self.events.push(VoiceEvent::Left { room_id });
        }
        self.publish_state();
    }

    /// The signaling channel is gone: tear down without sending.
    pub fn on_signaling_lost(&mut self) {
        if self.state.room_id.is_some() {
            self.teardown();
        }
    }

    fn audio_track_id(&self) -> Option<String> {
        self.peers.as_ref().and_then(|p| {
            p.local_tracks()
                .iter()
                .find(|t| t.kind == TrackKind::Audio)
                .map(|t| t.id.clone())
        })
    }

    fn apply_mute(&mut self) -> Result<(), VoiceError> {
        let muted = self.state.muted;
        if let Some(id) = self.audio_track_id() {
            self.peers_mut()?.set_track_enabled(&id, !muted)?;
        }
        self.publish_state();
        Ok(())
    }

    /// Unmuting while deafened also undeafens.
    pub fn toggle_mute(&mut self) -> Result<bool, VoiceError> {
        if self.peers.is_none() {
            return Err(VoiceError::NotInRoom);
        }
        if self.state.deafened {
            self.state.deafened = false;
            self.state.muted = false;
        } else {
            self.state.muted = !self.state.muted;
        }
        self.apply_mute()?;
        Ok(self.state.muted)
    }

    /// Deafen silences playback and mutes; undeafen restores the earlier
    /// mute setting.
    pub fn toggle_deafen(&mut self) -> Result<bool, VoiceError> {
        if self.peers.is_none() {
            return Err(VoiceError::NotInRoom);
        }
        if self.state.deafened {
            self.state.deafened = false;
            self.state.muted = self.muted_before_deafen;
        } else {
            self.muted_before_deafen = self.state.muted;
            self.state.deafened = true;
            self.state.muted = true;
        }
        self.apply_mute()?;
        Ok(self.state.deafened)
    }

    pub fn toggle_camera(&mut self) -> Result<bool, VoiceError> {
        let on = self.toggle_video(TrackKind::Camera)?;
        self.state.camera = on;
        self.publish_state();
        Ok(on)
    }

    pub fn start_screen_share(&mut self) -> Result<(), VoiceError> {
        if !self.state.screen {
            self.toggle_screen_share()?;
        }
        Ok(())
    }

    pub fn stop_screen_share(&mut self) -> Result<(), VoiceError> {
        if self.state.screen {
            self.toggle_screen_share()?;
        }
        Ok(())
    }

    pub fn toggle_screen_share(&mut self) -> Result<bool, VoiceError> {
        let on = self.toggle_video(TrackKind::Screen)?;
        self.state.screen = on;
        self.publish_state();
        Ok(on)
    }

    /// Add or drop one video track of `kind`; every link renegotiates.
    fn toggle_video(&mut self, kind: TrackKind) -> Result<bool, VoiceError> {
        let devices = Arc::clone(&self.devices);
        let peers = self.peers_mut()?;
        let existing = peers
            .local_tracks()
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| t.id.clone());
        if let Some(id) = existing {
            let track = peers.remove_local_track(&id)?;
            devices.release(&track);
            return Ok(false);
        }
        let track = acquire_video(devices.as_ref(), kind)?;
        if let Err(e) = peers.add_local_track(track.clone()) {
            devices.release(&track);
            return Err(e.into());
        }
        Ok(true)
    }

    /// Tell the room whom we whisper to; `None` stops.
    pub fn whisper(&mut self, target: Option<UserId>) -> Result<(), VoiceError> {
        let room_id = self.state.room_id.clone().ok_or(VoiceError::NotInRoom)?;
        self.channel.send(SignalingMsg::Whisper {
            room_id,
            from: self.local.user_id.clone(),
            target: target.clone(),
        })?;
        self.state.whisper_target = target;
        self.publish_state();
        Ok(())
    }

    // ---- relay events -----------------------------------------------------

    pub fn on_roster(&mut self, room_id: &str, members: Vec<Member>) {
        if !self.in_room(room_id) {
            sink_warn!(self.log, "[voice] roster for {} while not joining it", room_id);
            return;
        }
        self.roster = members;
        self.state.joined = true;
        self.events.push(VoiceEvent::Joined {
            room_id: room_id.to_owned(),
            roster: self.roster.clone(),
        });
        self.publish_state();
    }

    pub fn on_join_refused(&mut self, room_id: &str, code: u16) {
        if !self.in_room(room_id) {
            return;
        }
        sink_warn!(self.log, "[voice] join {} refused (code {})", room_id, code);
        self.teardown();
        self.events.push(VoiceEvent::JoinRefused {
            room_id: room_id.to_owned(),
            code,
        });
    }

    /// A newcomer: we are the existing member, so we offer.
    pub fn on_peer_joined(&mut self, room_id: &str, member: Member) -> Result<(), VoiceError> {
        if !self.in_room(room_id) || member.user_id == self.local.user_id {
            return Ok(());
        }
        if !self.roster.iter().any(|m| m.user_id == member.user_id) {
            self.roster.push(member.clone());
        }
        self.events.push(VoiceEvent::PeerJoined {
            room_id: room_id.to_owned(),
            member: member.clone(),
        });
        let peers = self.peers_mut()?;
        if peers.link_state(&member.user_id).is_some() {
            peers.close(&member.user_id);
        }
        peers.create_as_offerer(&member.user_id)?;
        Ok(())
    }

    pub fn on_peer_left(&mut self, room_id: &str, member: Member) {
        if !self.in_room(room_id) {
            return;
        }
        self.roster.retain(|m| m.user_id != member.user_id);
        if let Some(peers) = self.peers.as_mut() {
            peers.close(&member.user_id);
        }
        self.events.push(VoiceEvent::PeerLeft {
            room_id: room_id.to_owned(),
            member,
        });
    }

    pub fn on_whisper(&mut self, room_id: &str, from: UserId, target: Option<UserId>) {
        if self.in_room(room_id) {
            self.events.push(VoiceEvent::Whisper { from, target });
        }
    }

    pub fn on_offer(
        &mut self,
        room_id: &str,
        from: &str,
        sdp: &str,
        tracks: &[TrackInfo],
    ) -> Result<(), VoiceError> {
        if !self.in_room(room_id) {
            sink_warn!(self.log, "[voice] offer for {} from {} ignored", room_id, from);
            return Ok(());
        }
        self.peers_mut()?.on_remote_offer(from, sdp, tracks)?;
        Ok(())
    }

    pub fn on_answer(
        &mut self,
        room_id: &str,
        from: &str,
        sdp: &str,
        tracks: &[TrackInfo],
    ) -> Result<(), VoiceError> {
        if !self.in_room(room_id) {
            sink_warn!(self.log, "[voice] answer for {} from {} ignored", room_id, from);
            return Ok(());
        }
        self.peers_mut()?.on_remote_answer(from, sdp, tracks)?;
        Ok(())
    }

    pub fn on_candidate(&mut self, room_id: &str, from: &str, candidate: IceCandidate) {
        if !self.in_room(room_id) {
            return;
        }
        if let Some(peers) = self.peers.as_mut() {
            peers.on_remote_candidate(from, candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::NoopLogSink;
    use crate::media::SyntheticMediaDevices;
    use crate::peer::{SdpPeerConnectionFactory, SignalingState};
    use crate::signaling_client::RecordingChannel;

    struct Client {
        voice: GroupVoiceSession,
        chan: Arc<RecordingChannel>,
        devices: Arc<SyntheticMediaDevices>,
    }

    fn client(user: &str, port: u16) -> Client {
        let chan = Arc::new(RecordingChannel::new());
        let devices = Arc::new(SyntheticMediaDevices::new());
        let voice = GroupVoiceSession::new(
            Member::new(user, user),
            devices.clone(),
            Arc::new(SdpPeerConnectionFactory::with_base_port("127.0.0.1", port)),
            chan.clone(),
            Arc::new(NoopLogSink),
        );
        Client {
            voice,
            chan,
            devices,
        }
    }

    fn pump(from: &Client, to: &mut Client) {
        for msg in from.chan.take() {
            match msg {
                SignalingMsg::Offer {
                    from,
                    room_id,
                    sdp,
                    tracks,
                    ..
                } => to
                    .voice
                    .on_offer(&room_id.unwrap(), &from, &sdp, &tracks)
                    .unwrap(),
                SignalingMsg::Answer {
                    from,
                    room_id,
                    sdp,
                    tracks,
                    ..
                } => to
                    .voice
                    .on_answer(&room_id.unwrap(), &from, &sdp, &tracks)
                    .unwrap(),
                SignalingMsg::IceCandidate {
                    from,
                    room_id,
                    candidate,
                    ..
                } => to.voice.on_candidate(&room_id.unwrap(), &from, candidate),
                _ => {}
            }
        }
    }

    fn joined_pair() -> (Client, Client) {
        let mut a = client("alice", 5000);
        let mut b = client("bob", 6000);
        a.voice.join("r1", false).unwrap();
        a.voice.on_roster("r1", vec![Member::new("alice", "alice")]);
        b.voice.join("r1", false).unwrap();
        b.voice.on_roster(
            "r1",
            vec![Member::new("alice", "alice"), Member::new("bob", "bob")],
        );
        a.chan.take();
        b.chan.take();
        a.voice.on_peer_joined("r1", Member::new("bob", "bob")).unwrap();
        pump(&a, &mut b);
        pump(&b, &mut a);
        (a, b)
    }

    #[test]
    fn existing_member_offers_and_both_links_settle() {
        let (a, b) = joined_pair();
        let pa = a.voice.peers().unwrap();
        let pb = b.voice.peers().unwrap();
        assert_eq!(pa.link_state("bob"), Some(SignalingState::Stable));
        assert_eq!(pb.link_state("alice"), Some(SignalingState::Stable));
        let bob_media = pa.classifier().media_for("bob").unwrap();
        assert!(bob_media.voice.is_some());
        assert_eq!(a.voice.roster().len(), 2);
    }

    #[test]
    fn join_sends_join_room_and_refused_media_changes_nothing() {
        let mut a = client("alice", 5000);
        a.devices.set_deny_user_media(true);
        assert!(matches!(a.voice.join("r1", false), Err(VoiceError::Media(_))));
        assert!(a.voice.room_id().is_none());
        assert!(a.chan.take().is_empty());

        a.devices.set_deny_user_media(false);
        a.voice.join("r1", false).unwrap();
        assert_eq!(
            a.chan.take(),
            vec![SignalingMsg::JoinRoom {
                room_id: "r1".into()
            }]
        );
        assert!(matches!(
            a.voice.join("r2", false),
            Err(VoiceError::AlreadyInRoom(_))
        ));
    }

    #[test]
    fn peer_left_closes_only_that_link() {
        let (mut a, _b) = joined_pair();
        a.voice.on_peer_left("r1", Member::new("bob", "bob"));
        assert!(a.voice.peers().unwrap().peers().is_empty());
        assert_eq!(a.voice.roster().len(), 1);
    }

    #[test]
    fn leave_releases_media_and_notifies_relay() {
        let (mut a, _b) = joined_pair();
        a.voice.leave().unwrap();
        assert!(a.voice.room_id().is_none());
        assert_eq!(a.devices.live_track_count(), 0);
        assert!(
            a.chan
                .take()
                .contains(&SignalingMsg::LeaveRoom { room_id: "r1".into() })
        );
        assert!(matches!(a.voice.leave(), Err(VoiceError::NotInRoom)));
    }

    #[test]
    fn deafen_implies_mute_and_undeafen_restores() {
        let (mut a, _b) = joined_pair();
        assert!(a.voice.toggle_deafen().unwrap());
        assert!(a.voice.state().muted);
        assert!(!a.voice.toggle_deafen().unwrap());
        assert!(!a.voice.state().muted);

        assert!(a.voice.toggle_mute().unwrap());
        a.voice.toggle_deafen().unwrap();
        a.voice.toggle_deafen().unwrap();
        assert!(a.voice.state().muted);
        let audio = &a.voice.peers().unwrap().local_tracks()[0];
        assert!(!audio.enabled);
    }

    #[test]
    fn screen_share_is_classified_as_screen_remotely() {
        let (mut a, mut b) = joined_pair();
        a.voice.start_screen_share().unwrap();
        assert!(a.voice.state().screen);
        pump(&a, &mut b);
        pump(&b, &mut a);
        let media = b.voice.peers().unwrap().classifier().media_for("alice").unwrap();
        assert!(media.screen.is_some());
        assert!(media.camera.is_none());

        a.voice.stop_screen_share().unwrap();
        pump(&a, &mut b);
        let media = b.voice.peers().unwrap().classifier().media_for("alice").unwrap();
        assert!(media.screen.is_none());
        assert!(media.voice.is_some());
    }

    #[test]
    fn join_refusal_tears_down() {
        let mut a = client("alice", 5000);
        a.voice.join("secret", false).unwrap();
        a.voice.on_join_refused("secret", 10);
        assert!(a.voice.room_id().is_none());
        assert_eq!(a.devices.live_track_count(), 0);
        assert!(a.voice.take_events().iter().any(|e| matches!(
            e,
            VoiceEvent::JoinRefused { code: 10, .. }
        )));
    }

    #[test]
    fn whisper_is_sent_to_room() {
        let (mut a, _b) = joined_pair();
        a.voice.whisper(Some("bob".into())).unwrap();
        assert_eq!(
            a.chan.take(),
            vec![SignalingMsg::Whisper {
                room_id: "r1".into(),
                from: "alice".into(),
                target: Some("bob".into()),
            }]
        );
        assert_eq!(a.voice.state().whisper_target.as_deref(), Some("bob"));
    }
}

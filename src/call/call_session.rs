use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::call::{CallError, CallStatus};
use crate::log::LogSink;
use crate::media::{MediaDevices, TrackKind, acquire_video};
use crate::peer::{PeerConnectionFactory, PeerOrchestrator, PeerUpdate};
use crate::signaling::protocol::{
    CallId, IceCandidate, Member, SignalingMsg, TrackInfo, UserId, UserName,
};
use crate::signaling_client::SignalingChannel;
use crate::{sink_info, sink_warn};

/// The other party of the current call attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCall {
    pub call_id: CallId,
    pub peer: UserId,
    pub peer_name: UserName,
    pub is_video: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    Status {
        status: CallStatus,
        peer: Option<UserId>,
    },
    Incoming {
        call_id: CallId,
        from: UserId,
        username: UserName,
        is_video: bool,
    },
    Media(PeerUpdate),
}

/// At most one private call per local user: `Idle → Calling → InCall` for
/// the caller, `Idle → Receiving → InCall` for the callee.
pub struct CallSession {
    local: Member,
    status: CallStatus,
    status_since: Instant,
    active: Option<ActiveCall>,
    /// Caller's offer, kept while we ring.
    pending_offer: Option<(String, Vec<TrackInfo>)>,
    peers: PeerOrchestrator,
    devices: Arc<dyn MediaDevices>,
    channel: Arc<dyn SignalingChannel>,
    log: Arc<dyn LogSink>,
    ring_timeout: Option<Duration>,
    events: Vec<CallEvent>,
}

impl CallSession {
    pub fn new(
        local: Member,
        devices: Arc<dyn MediaDevices>,
        factory: Arc<dyn PeerConnectionFactory>,
        channel: Arc<dyn SignalingChannel>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        let peers = PeerOrchestrator::new(
            local.user_id.clone(),
            None,
            factory,
            Arc::clone(&channel),
            Arc::clone(&log),
        );
        Self {
            local,
            status: CallStatus::Idle,
            status_since: Instant::now(),
            active: None,
            pending_offer: None,
            peers,
            devices,
            channel,
            log,
            ring_timeout: None,
            events: Vec::new(),
        }
    }

    /// End/decline calls that ring longer than `timeout`. `None` disables.
    pub fn with_ring_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ring_timeout = timeout;
        self
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn active(&self) -> Option<&ActiveCall> {
        self.active.as_ref()
    }

    pub fn peers(&self) -> &PeerOrchestrator {
        &self.peers
    }

    pub fn take_events(&mut self) -> Vec<CallEvent> {
        self.collect_media();
        std::mem::take(&mut self.events)
    }

    fn collect_media(&mut self) {
        self.events
            .extend(self.peers.take_updates().into_iter().map(CallEvent::Media));
    }

    fn set_status(&mut self, status: CallStatus) {
        self.collect_media();
        self.status = status;
        self.status_since = Instant::now();
        self.events.push(CallEvent::Status {
            status,
            peer: self.active.as_ref().map(|c| c.peer.clone()),
        });
        sink_info!(self.log, "[call] status -> {}", status);
    }

    fn require(&self, op: &'static str, allowed: &[CallStatus]) -> Result<(), CallError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(CallError::InvalidState {
                op,
                status: self.status,
            })
        }
    }

    /// Whether a call message belongs to the call we are in.
    fn matches(&self, from: &str, call_id: CallId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|c| c.peer == from && c.call_id == call_id)
    }

    fn release_media(&mut self) {
        for t in self.peers.take_local_tracks() {
            self.devices.release(&t);
        }
    }

    /// Close the link, release capture and forget the call.
    fn teardown(&mut self) {
        self.peers.close_all();
        self.release_media();
        self.pending_offer = None;
        self.set_status(CallStatus::Idle);
        self.active = None;
    }

    // ---- local actions ----------------------------------------------------

    /// Start a call. Media is acquired first; if that fails nothing changes.
    ///
    /// # Errors
    /// Not idle, calling ourselves, capture refused, or the channel is gone.
    pub fn initiate(&mut self, target: &str, is_video: bool) -> Result<CallId, CallError> {
        self.require("call", &[CallStatus::Idle])?;
        if target == self.local.user_id {
            return Err(CallError::SelfCall);
        }
        let tracks = self.devices.acquire_user_media(true, is_video)?;
        self.peers.set_local_tracks(tracks);

        let call_id = rand::thread_rng().r#gen::<CallId>().max(1);
        if let Err(e) = self.send_request(target, call_id, is_video) {
            self.peers.close_all();
            self.release_media();
            return Err(e);
        }

        self.active = Some(ActiveCall {
            call_id,
            peer: target.to_owned(),
            peer_name: String::new(),
            is_video,
        });
        self.set_status(CallStatus::Calling);
        Ok(call_id)
    }

    fn send_request(&mut self, target: &str, call_id: CallId, is_video: bool) -> Result<(), CallError> {
        let sdp = self.peers.open_offer(target)?;
        self.channel.send(SignalingMsg::CallRequest {
            from: self.local.user_id.clone(),
            from_username: self.local.username.clone(),
            to: target.to_owned(),
            call_id,
            sdp,
            is_video,
            tracks: self.peers.track_announcement(),
        })?;
        self.peers.send_local_candidates(target)?;
        Ok(())
    }

    /// Answer the ringing call.
    ///
    /// # Errors
    /// Not receiving, capture refused (the call keeps ringing), or a bad
    /// offer / channel failure.
    pub fn accept(&mut self) -> Result<(), CallError> {
        self.require("accept", &[CallStatus::Receiving])?;
        let (Some(call), Some((offer, announced))) = (self.active.clone(), self.pending_offer.take())
        else {
            return Err(CallError::InvalidState {
                op: "accept",
                status: self.status,
            });
        };

        let tracks = match self.devices.acquire_user_media(true, call.is_video) {
            Ok(t) => t,
            Err(e) => {
                self.pending_offer = Some((offer, announced));
                return Err(e.into());
            }
        };
        self.peers.set_local_tracks(tracks);

        let answer = match self.peers.accept_offer(&call.peer, &offer, &announced) {
            Ok(a) => a,
            Err(e) => {
                self.peers.close_all();
                self.release_media();
                self.pending_offer = Some((offer, announced));
                return Err(e.into());
            }
        };
        if let Err(e) = self.channel.send(SignalingMsg::CallAccept {
            from: self.local.user_id.clone(),
            to: call.peer.clone(),
            call_id: call.call_id,
            sdp: answer,
            tracks: self.peers.track_announcement(),
        }) {
            self.peers.close_all();
            self.release_media();
            self.pending_offer = Some((offer, announced));
            return Err(e.into());
        }
        self.peers.send_local_candidates(&call.peer)?;
        self.set_status(CallStatus::InCall);
        Ok(())
    }

    pub fn decline(&mut self) -> Result<(), CallError> {
        self.require("decline", &[CallStatus::Receiving])?;
        let sent = match &self.active {
            Some(call) => self.channel.send(SignalingMsg::CallDecline {
                from: self.local.user_id.clone(),
                to: call.peer.clone(),
                call_id: call.call_id,
            }),
            None => Ok(()),
        };
        self.teardown();
        sent.map_err(CallError::from)
    }

    /// Hang up, or cancel our own ringing request.
    pub fn end(&mut self) -> Result<(), CallError> {
        self.require("end", &[CallStatus::Calling, CallStatus::InCall])?;
        let sent = match &self.active {
            Some(call) => self.channel.send(SignalingMsg::CallEnd {
                from: self.local.user_id.clone(),
                to: call.peer.clone(),
                call_id: call.call_id,
            }),
            None => Ok(()),
        };
        self.teardown();
        sent.map_err(CallError::from)
    }

    /// Camera on/off during a call; renegotiates the link.
    pub fn toggle_camera(&mut self) -> Result<bool, CallError> {
        self.require("toggle camera", &[CallStatus::InCall])?;
        self.toggle_video(TrackKind::Camera)
    }

    /// Screen share on/off during a call; renegotiates the link.
    pub fn toggle_screen_share(&mut self) -> Result<bool, CallError> {
        self.require("share screen", &[CallStatus::InCall])?;
        self.toggle_video(TrackKind::Screen)
    }

    fn toggle_video(&mut self, kind: TrackKind) -> Result<bool, CallError> {
        let existing = self
            .peers
            .local_tracks()
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| t.id.clone());
        if let Some(id) = existing {
            let track = self.peers.remove_local_track(&id)?;
            self.devices.release(&track);
            return Ok(false);
        }
        let track = acquire_video(self.devices.as_ref(), kind)?;
        if let Err(e) = self.peers.add_local_track(track.clone()) {
            self.devices.release(&track);
            return Err(e.into());
        }
        Ok(true)
    }

    /// Flip the call microphone between live and muted. Returns whether
    /// it is muted now.
    pub fn toggle_mute(&mut self) -> Result<bool, CallError> {
        self.require("mute", &[CallStatus::Calling, CallStatus::InCall])?;
        let audio = self
            .peers
            .local_tracks()
            .iter()
            .find(|t| t.kind == TrackKind::Audio)
            .map(|t| (t.id.clone(), t.enabled));
        let Some((id, enabled)) = audio else {
            return Ok(false);
        };
        self.peers.set_track_enabled(&id, !enabled)?;
        Ok(enabled)
    }

    /// Apply the ring timeout, if one is configured.
    pub fn tick(&mut self, now: Instant) -> Result<(), CallError> {
        let Some(timeout) = self.ring_timeout else {
            return Ok(());
        };
        if !self.status.is_ringing() || now.saturating_duration_since(self.status_since) < timeout {
            return Ok(());
        }
        sink_info!(self.log, "[call] ring timeout after {:?}", timeout);
        match self.status {
            CallStatus::Calling => self.end(),
            _ => self.decline(),
        }
    }

    /// The signaling channel is gone: drop everything without sending.
    pub fn on_signaling_lost(&mut self) {
        if self.status != CallStatus::Idle {
            self.teardown();
        } else {
            self.peers.close_all();
        }
    }

    // ---- remote events ----------------------------------------------------

    pub fn on_call_request(
        &mut self,
        from: &str,
        username: &str,
        call_id: CallId,
        sdp: String,
        is_video: bool,
        tracks: Vec<TrackInfo>,
    ) {
        match self.status {
            CallStatus::Idle => {}
            CallStatus::Calling if self.active.as_ref().is_some_and(|c| c.peer == from) => {
                // both sides called each other: the smaller id stays caller
                if self.local.user_id.as_str() < from {
                    sink_warn!(self.log, "[call] crossed call from {}, keeping ours", from);
                    return;
                }
                sink_info!(self.log, "[call] crossed call from {}, yielding", from);
                self.peers.close_all();
                self.release_media();
            }
            status => {
                sink_warn!(self.log, "[call] busy ({}), dropping request from {}", status, from);
                return;
            }
        }

        self.active = Some(ActiveCall {
            call_id,
            peer: from.to_owned(),
            peer_name: username.to_owned(),
            is_video,
        });
        self.pending_offer = Some((sdp, tracks));
        self.events.push(CallEvent::Incoming {
            call_id,
            from: from.to_owned(),
            username: username.to_owned(),
            is_video,
        });
        self.set_status(CallStatus::Receiving);
    }

    pub fn on_call_accept(
        &mut self,
        from: &str,
        call_id: CallId,
        sdp: &str,
        tracks: &[TrackInfo],
    ) -> Result<(), CallError> {
        if self.status != CallStatus::Calling || !self.matches(from, call_id) {
            sink_warn!(self.log, "[call] stray call-accept from {} ({})", from, call_id);
            return Ok(());
        }
        if let Err(e) = self.peers.on_remote_answer(from, sdp, tracks) {
            if let Err(end_err) = self.end() {
                sink_warn!(self.log, "[call] call-end after bad answer failed: {}", end_err);
            }
            return Err(e.into());
        }
        self.set_status(CallStatus::InCall);
        Ok(())
    }

    pub fn on_call_decline(&mut self, from: &str, call_id: CallId) {
        if self.status != CallStatus::Calling || !self.matches(from, call_id) {
            sink_warn!(self.log, "[call] stray call-decline from {} ({})", from, call_id);
            return;
        }
        sink_info!(self.log, "[call] {} declined", from);
        self.teardown();
    }

    pub fn on_call_end(&mut self, from: &str, call_id: CallId) {
        if self.status == CallStatus::Idle || !self.matches(from, call_id) {
            sink_warn!(self.log, "[call] stray call-end from {} ({})", from, call_id);
            return;
        }
        sink_info!(self.log, "[call] {} ended the call", from);
        self.teardown();
    }

    /// Renegotiation offer on the call link.
    pub fn on_offer(&mut self, from: &str, sdp: &str, tracks: &[TrackInfo]) -> Result<(), CallError> {
        if !self.is_call_peer(from) {
            sink_warn!(self.log, "[call] offer from {} outside a call", from);
            return Ok(());
        }
        self.peers.on_remote_offer(from, sdp, tracks)?;
        Ok(())
    }

    pub fn on_answer(&mut self, from: &str, sdp: &str, tracks: &[TrackInfo]) -> Result<(), CallError> {
        if !self.is_call_peer(from) {
            sink_warn!(self.log, "[call] answer from {} outside a call", from);
            return Ok(());
        }
        self.peers.on_remote_answer(from, sdp, tracks)?;
        Ok(())
    }

    /// Candidates may arrive while we still ring; they wait in the queue
    /// until the call is accepted. The callee only trickles after its
    /// call-accept, so anything reaching us while Calling belongs to an
    /// attempt the peer abandoned.
    pub fn on_candidate(&mut self, from: &str, candidate: IceCandidate) {
        if !self.active.as_ref().is_some_and(|c| c.peer == from) {
            sink_warn!(self.log, "[call] candidate from {} outside a call", from);
            return;
        }
        if self.status == CallStatus::Calling {
            sink_warn!(
                self.log,
                "[call] dropping stale candidate from {}: {}",
                from,
                candidate.candidate
            );
            return;
        }
        self.peers.on_remote_candidate(from, candidate);
    }

    fn is_call_peer(&self, from: &str) -> bool {
        self.status == CallStatus::InCall && self.active.as_ref().is_some_and(|c| c.peer == from)
    }
}

use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use crate::call::{CallSession, CallStatus};
use crate::client::{ClientCommand, ClientEvent, ClientSettings, Health, HealthMonitor};
use crate::log::LogSink;
use crate::media::MediaDevices;
use crate::peer::PeerConnectionFactory;
use crate::signaling::protocol::{Member, SignalingMsg};
use crate::signaling_client::SignalingChannel;
use crate::voice::GroupVoiceSession;
use crate::{sink_debug, sink_warn};

/// The client's state machines behind one signaling channel. Not thread
/// safe on purpose: the runtime feeds it one input at a time.
pub struct MeshClient {
    identity: Member,
    channel: Arc<dyn SignalingChannel>,
    call: CallSession,
    voice: GroupVoiceSession,
    health: HealthMonitor,
    log: Arc<dyn LogSink>,
    events: Vec<ClientEvent>,
}

impl MeshClient {
    pub fn new(
        identity: Member,
        settings: &ClientSettings,
        devices: Arc<dyn MediaDevices>,
        factory: Arc<dyn PeerConnectionFactory>,
        channel: Arc<dyn SignalingChannel>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        let call = CallSession::new(
            identity.clone(),
            Arc::clone(&devices),
            Arc::clone(&factory),
            Arc::clone(&channel),
            Arc::clone(&log),
        )
        .with_ring_timeout(settings.ring_timeout);
        let voice = GroupVoiceSession::new(
            identity.clone(),
            devices,
            factory,
            Arc::clone(&channel),
            Arc::clone(&log),
        );
        Self {
            events: vec![ClientEvent::Connected(identity.clone())],
            identity,
            channel,
            call,
            voice,
            health: HealthMonitor::new(settings.ping_interval, Instant::now()),
            log,
        }
    }

    pub fn identity(&self) -> &Member {
        &self.identity
    }

    pub fn call(&self) -> &CallSession {
        &self.call
    }

    pub fn voice(&self) -> &GroupVoiceSession {
        &self.voice
    }

    pub fn health(&self) -> Health {
        self.health.health()
    }

    /// Pending events, call and voice session output included.
    pub fn take_events(&mut self) -> Vec<ClientEvent> {
        let mut out = std::mem::take(&mut self.events);
        out.extend(self.call.take_events().into_iter().map(ClientEvent::Call));
        out.extend(self.voice.take_events().into_iter().map(ClientEvent::Voice));
        out
    }

    fn report(&mut self, what: &str, err: impl Display) {
        sink_warn!(self.log, "[client] {} failed: {}", what, err);
        self.events.push(ClientEvent::Error(format!("{what}: {err}")));
    }

    /// Route one relay message. Room-scoped negotiation goes to the voice
    /// session, unscoped negotiation to the call.
    pub fn handle_signaling(&mut self, msg: SignalingMsg, now: Instant) {
        match msg {
            SignalingMsg::RoomRoster { room_id, members } => self.voice.on_roster(&room_id, members),
            SignalingMsg::JoinErr { room_id, code } => self.voice.on_join_refused(&room_id, code),
            SignalingMsg::PeerJoined {
                room_id,
                user_id,
                username,
            } => {
                if let Err(e) = self
                    .voice
                    .on_peer_joined(&room_id, Member::new(user_id, username))
                {
                    self.report("offer to newcomer", e);
                }
            }
            SignalingMsg::PeerLeft {
                room_id,
                user_id,
                username,
            } => self
                .voice
                .on_peer_left(&room_id, Member::new(user_id, username)),
            SignalingMsg::Whisper {
                room_id,
                from,
                target,
            } => self.voice.on_whisper(&room_id, from, target),

            SignalingMsg::Offer {
                from,
                room_id,
                sdp,
                tracks,
                ..
            } => {
                let res = match room_id {
                    Some(room) => self.voice.on_offer(&room, &from, &sdp, &tracks).map_err(|e| e.to_string()),
                    None => self.call.on_offer(&from, &sdp, &tracks).map_err(|e| e.to_string()),
                };
                if let Err(e) = res {
                    self.report("answer offer", e);
                }
            }
            SignalingMsg::Answer {
                from,
                room_id,
                sdp,
                tracks,
                ..
            } => {
                let res = match room_id {
                    Some(room) => self.voice.on_answer(&room, &from, &sdp, &tracks).map_err(|e| e.to_string()),
                    None => self.call.on_answer(&from, &sdp, &tracks).map_err(|e| e.to_string()),
                };
                if let Err(e) = res {
                    self.report("apply answer", e);
                }
            }
            SignalingMsg::IceCandidate {
                from,
                room_id,
                candidate,
                ..
            } => match room_id {
                Some(room) => self.voice.on_candidate(&room, &from, candidate),
                None => self.call.on_candidate(&from, candidate),
            },

            SignalingMsg::CallRequest {
                from,
                from_username,
                call_id,
                sdp,
                is_video,
                tracks,
                ..
            } => self
                .call
                .on_call_request(&from, &from_username, call_id, sdp, is_video, tracks),
            SignalingMsg::CallAccept {
                from,
                call_id,
                sdp,
                tracks,
                ..
            } => {
                if let Err(e) = self.call.on_call_accept(&from, call_id, &sdp, &tracks) {
                    self.report("apply call answer", e);
                }
            }
            SignalingMsg::CallDecline { from, call_id, .. } => self.call.on_call_decline(&from, call_id),
            SignalingMsg::CallEnd { from, call_id, .. } => self.call.on_call_end(&from, call_id),

            SignalingMsg::Pong { .. } => {
                if let Some(h) = self.health.on_pong(now) {
                    self.events.push(ClientEvent::Health(h));
                }
            }
            other => sink_debug!(self.log, "[client] ignoring {}", other.name()),
        }
    }

    /// Run one user command. Returns `false` when the user wants to quit.
    pub fn handle_command(&mut self, cmd: ClientCommand) -> bool {
        let in_call = self.call.status() == CallStatus::InCall;
        let res = match cmd {
            ClientCommand::Join { room_id, video } => {
                self.voice.join(&room_id, video).map_err(|e| e.to_string())
            }
            ClientCommand::Leave => self.voice.leave().map_err(|e| e.to_string()),
            ClientCommand::Call { user_id, video } => self
                .call
                .initiate(&user_id, video)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            ClientCommand::Accept => self.call.accept().map_err(|e| e.to_string()),
            ClientCommand::Decline => self.call.decline().map_err(|e| e.to_string()),
            ClientCommand::End => self.call.end().map_err(|e| e.to_string()),
            ClientCommand::Camera if in_call => {
                self.call.toggle_camera().map(|_| ()).map_err(|e| e.to_string())
            }
            ClientCommand::Camera => self.voice.toggle_camera().map(|_| ()).map_err(|e| e.to_string()),
            ClientCommand::Screen if in_call => self
                .call
                .toggle_screen_share()
                .map(|_| ())
                .map_err(|e| e.to_string()),
            ClientCommand::Screen => self
                .voice
                .toggle_screen_share()
                .map(|_| ())
                .map_err(|e| e.to_string()),
            ClientCommand::Mute if self.voice.room_id().is_none() => {
                self.call.toggle_mute().map(|_| ()).map_err(|e| e.to_string())
            }
            ClientCommand::Mute => self.voice.toggle_mute().map(|_| ()).map_err(|e| e.to_string()),
            ClientCommand::Deafen => self.voice.toggle_deafen().map(|_| ()).map_err(|e| e.to_string()),
            ClientCommand::Whisper(target) => self.voice.whisper(target).map_err(|e| e.to_string()),
            ClientCommand::Quit => {
                if self.call.status() != CallStatus::Idle {
                    let _ = self.call.end().or_else(|_| self.call.decline());
                }
                if self.voice.room_id().is_some() {
                    let _ = self.voice.leave();
                }
                return false;
            }
        };
        if let Err(e) = res {
            self.report("command", e);
        }
        true
    }

    /// Keepalive, health and ring timeout.
    pub fn tick(&mut self, now: Instant) {
        if let Some(nonce) = self.health.ping_due(now) {
            if let Err(e) = self.channel.send(SignalingMsg::Ping { nonce }) {
                self.report("ping", e);
            }
        }
        if let Some(h) = self.health.evaluate(now) {
            self.events.push(ClientEvent::Health(h));
        }
        if let Err(e) = self.call.tick(now) {
            self.report("ring timeout", e);
        }
    }

    /// The relay connection is gone: drop every session locally.
    pub fn on_disconnected(&mut self) {
        self.call.on_signaling_lost();
        self.voice.on_signaling_lost();
        if let Some(h) = self.health.mark_disconnected() {
            self.events.push(ClientEvent::Health(h));
        }
        self.events.push(ClientEvent::Disconnected);
    }
}

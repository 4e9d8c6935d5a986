use std::sync::Arc;

use crate::log::NoopLogSink;
use crate::log::log_sink::LogSink;
use crate::signaling::auth::{AllowAllAuthBackend, AuthBackend, AuthError};
use crate::signaling::call_ledger::CallLedger;
use crate::signaling::errors::JoinErrorCode;
use crate::signaling::membership::{AllowAllMembership, MembershipBackend};
use crate::signaling::presence::Presence;
use crate::signaling::protocol::{Member, RoomId, SignalingMsg, UserId};
use crate::signaling::rooms::{JoinOutcome, RoomKey, RoomRegistry};
use crate::signaling::types::{ClientId, OutgoingMsg};
use crate::{sink_debug, sink_info, sink_trace, sink_warn};

/// The relay's state machine. Pure: consumes one inbound event, returns the
/// messages to deliver. All I/O lives in the runtime around it.
pub struct ServerEngine {
    presence: Presence,
    rooms: RoomRegistry,
    calls: CallLedger,
    log: Arc<dyn LogSink>,
    auth: Box<dyn AuthBackend>,
    membership: Box<dyn MembershipBackend>,
}

impl Default for ServerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerEngine {
    pub fn new() -> Self {
        Self::with_backends(
            Arc::new(NoopLogSink),
            Box::new(AllowAllAuthBackend),
            Box::new(AllowAllMembership),
        )
    }

    /// Custom logger, "accept all" auth and membership.
    pub fn with_log(log: Arc<dyn LogSink>) -> Self {
        Self::with_backends(log, Box::new(AllowAllAuthBackend), Box::new(AllowAllMembership))
    }

    /// Fully explicit constructor.
    pub fn with_backends(
        log: Arc<dyn LogSink>,
        auth: Box<dyn AuthBackend>,
        membership: Box<dyn MembershipBackend>,
    ) -> Self {
        Self {
            presence: Presence::new(),
            rooms: RoomRegistry::new(),
            calls: CallLedger::new(),
            log,
            auth,
            membership,
        }
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn calls(&self) -> &CallLedger {
        &self.calls
    }

    /// Current roster of a group room.
    pub fn roster(&self, room_id: &str) -> Vec<Member> {
        self.rooms.roster(&RoomKey::Group(room_id.to_owned()))
    }

    /// Main entrypoint: handle a message from a client.
    pub fn handle(&mut self, from_cid: ClientId, msg: SignalingMsg) -> Vec<OutgoingMsg> {
        let Some(member) = self.presence.member_for(from_cid).cloned() else {
            return self.handle_unauthenticated(from_cid, msg);
        };

        match msg {
            SignalingMsg::Authenticate { .. } => {
                sink_warn!(
                    self.log,
                    "client {} ({}) re-sent authenticate; ignoring",
                    from_cid,
                    member.user_id
                );
                Vec::new()
            }

            SignalingMsg::JoinRoom { room_id } => self.handle_join(from_cid, &member, room_id),
            SignalingMsg::LeaveRoom { room_id } => self.handle_leave(from_cid, room_id),

            SignalingMsg::Whisper { room_id, target, .. } => {
                self.handle_whisper(from_cid, &member, room_id, target)
            }

            SignalingMsg::Offer { .. }
            | SignalingMsg::Answer { .. }
            | SignalingMsg::IceCandidate { .. }
            | SignalingMsg::CallRequest { .. }
            | SignalingMsg::CallAccept { .. }
            | SignalingMsg::CallDecline { .. }
            | SignalingMsg::CallEnd { .. } => self.forward_directed(from_cid, &member, msg),

            SignalingMsg::Ping { nonce } => {
                vec![OutgoingMsg::to(from_cid, SignalingMsg::Pong { nonce })]
            }
            SignalingMsg::Pong { .. } => Vec::new(),

            SignalingMsg::AuthOk { .. }
            | SignalingMsg::AuthErr { .. }
            | SignalingMsg::RoomRoster { .. }
            | SignalingMsg::JoinErr { .. }
            | SignalingMsg::PeerJoined { .. }
            | SignalingMsg::PeerLeft { .. } => {
                sink_warn!(
                    self.log,
                    "ignoring server-only msg {} from client {}",
                    msg.name(),
                    from_cid
                );
                Vec::new()
            }
        }
    }

    /// Called when a TCP connection closes, to clean up state.
    pub fn handle_disconnect(&mut self, client: ClientId) -> Vec<OutgoingMsg> {
        let mut out_msgs = Vec::new();

        let Some(member) = self.presence.logout(client) else {
            sink_info!(self.log, "client {} disconnected (was not authenticated)", client);
            return out_msgs;
        };

        let left = self.rooms.leave_all(client);
        let mut user_gone = false;
        for (key, outcome) in &left {
            match key {
                RoomKey::Private(_) => user_gone = outcome.last_for_user,
                RoomKey::Group(room_id) if outcome.last_for_user => {
                    out_msgs.extend(self.peer_left_broadcast(room_id, &outcome.member));
                }
                RoomKey::Group(_) => {}
            }
        }

        sink_info!(
            self.log,
            "client {} ({}) disconnected; left {} rooms{}",
            client,
            member.user_id,
            left.len(),
            if user_gone { ", user offline" } else { "" }
        );

        if user_gone {
            for (partner, call_id) in self.calls.take_partners(&member.user_id) {
                sink_info!(
                    self.log,
                    "implicit call-end for call {} between {} and {}",
                    call_id,
                    member.user_id,
                    partner
                );
                let end = SignalingMsg::CallEnd {
                    from: member.user_id.clone(),
                    to: partner.clone(),
                    call_id,
                };
                out_msgs.extend(self.deliver_to_user(&partner, &end));
            }
        }

        out_msgs
    }

    // ---- Individual handlers ---------------------------------------------

    fn handle_unauthenticated(&mut self, from_cid: ClientId, msg: SignalingMsg) -> Vec<OutgoingMsg> {
        let token = match msg {
            SignalingMsg::Authenticate { token } => token,
            other => {
                sink_warn!(
                    self.log,
                    "client {} sent {} before authenticating; refusing",
                    from_cid,
                    other.name()
                );
                return vec![auth_refusal(from_cid, AuthError::MissingCredential)];
            }
        };

        match self.auth.verify(&token) {
            Ok(member) => {
                self.presence.login(from_cid, member.clone());
                self.rooms.join(
                    RoomKey::Private(member.user_id.clone()),
                    from_cid,
                    member.clone(),
                );
                sink_info!(
                    self.log,
                    "client {} authenticated as {} ({})",
                    from_cid,
                    member.user_id,
                    member.username
                );
                vec![OutgoingMsg::to(
                    from_cid,
                    SignalingMsg::AuthOk {
                        user_id: member.user_id,
                        username: member.username,
                    },
                )]
            }
            Err(e) => {
                sink_warn!(self.log, "client {} failed authentication: {}", from_cid, e);
                vec![auth_refusal(from_cid, e)]
            }
        }
    }

    fn handle_join(&mut self, client: ClientId, member: &Member, room_id: RoomId) -> Vec<OutgoingMsg> {
        if room_id.trim().is_empty() {
            return vec![join_refusal(client, room_id, JoinErrorCode::InvalidRoom)];
        }
        if !self.membership.is_member(&member.user_id, &room_id) {
            sink_warn!(
                self.log,
                "user {} not authorized for room {}",
                member.user_id,
                room_id
            );
            return vec![join_refusal(client, room_id, JoinErrorCode::NotAuthorized)];
        }

        let key = RoomKey::Group(room_id.clone());
        let outcome = self.rooms.join(key.clone(), client, member.clone());

        let mut out_msgs = vec![OutgoingMsg::to(
            client,
            SignalingMsg::RoomRoster {
                room_id: room_id.clone(),
                members: self.rooms.roster(&key),
            },
        )];

        match outcome {
            JoinOutcome::AlreadyJoined => {
                sink_debug!(self.log, "client {} re-joined room {}", client, room_id);
            }
            JoinOutcome::Joined { first_for_user } => {
                sink_info!(
                    self.log,
                    "user {} joined room {} ({} connections)",
                    member.user_id,
                    room_id,
                    self.rooms.connection_count(&key)
                );
                if first_for_user {
                    let joined = SignalingMsg::PeerJoined {
                        room_id,
                        user_id: member.user_id.clone(),
                        username: member.username.clone(),
                    };
                    for target in self.rooms.clients_in(&key) {
                        if target != client {
                            out_msgs.push(OutgoingMsg::to(target, joined.clone()));
                        }
                    }
                }
            }
        }
        out_msgs
    }

    fn handle_leave(&mut self, client: ClientId, room_id: RoomId) -> Vec<OutgoingMsg> {
        let key = RoomKey::Group(room_id.clone());
        let Some(outcome) = self.rooms.leave(&key, client) else {
            sink_warn!(
                self.log,
                "client {} tried to leave room {} it is not in",
                client,
                room_id
            );
            return Vec::new();
        };

        sink_info!(
            self.log,
            "user {} left room {}{}",
            outcome.member.user_id,
            room_id,
            if outcome.room_destroyed { " (room closed)" } else { "" }
        );

        if outcome.last_for_user {
            self.peer_left_broadcast(&room_id, &outcome.member)
        } else {
            Vec::new()
        }
    }

    fn handle_whisper(
        &mut self,
        client: ClientId,
        member: &Member,
        room_id: RoomId,
        target: Option<UserId>,
    ) -> Vec<OutgoingMsg> {
        let key = RoomKey::Group(room_id.clone());
        if !self.rooms.contains_client(&key, client) {
            sink_warn!(
                self.log,
                "dropping whisper from client {}: not in room {}",
                client,
                room_id
            );
            return Vec::new();
        }
        let msg = SignalingMsg::Whisper {
            room_id,
            from: member.user_id.clone(),
            target,
        };
        self.rooms
            .clients_in(&key)
            .into_iter()
            .filter(|c| *c != client)
            .map(|c| OutgoingMsg::to(c, msg.clone()))
            .collect()
    }

    /// Directed relay: stamp the sender and hand the event to every live
    /// connection of the target. Offline targets are a silent drop.
    fn forward_directed(
        &mut self,
        client: ClientId,
        member: &Member,
        mut msg: SignalingMsg,
    ) -> Vec<OutgoingMsg> {
        msg.set_sender(&member.user_id);
        if let SignalingMsg::CallRequest { from_username, .. } = &mut msg {
            from_username.clone_from(&member.username);
        }

        let Some(target) = msg.target().cloned() else {
            return Vec::new();
        };

        if target == member.user_id {
            sink_warn!(
                self.log,
                "client {} addressed {} to itself; dropping",
                client,
                msg.name()
            );
            return Vec::new();
        }

        let room_scope = match &msg {
            SignalingMsg::Offer { room_id, .. }
            | SignalingMsg::Answer { room_id, .. }
            | SignalingMsg::IceCandidate { room_id, .. } => room_id.clone(),
            _ => None,
        };
        if let Some(room_id) = room_scope {
            let key = RoomKey::Group(room_id.clone());
            if !self.rooms.contains_client(&key, client) {
                sink_warn!(
                    self.log,
                    "dropping {} from {}: sender not in room {}",
                    msg.name(),
                    member.user_id,
                    room_id
                );
                return Vec::new();
            }
        }

        match &msg {
            SignalingMsg::CallRequest { call_id, .. } | SignalingMsg::CallAccept { call_id, .. } => {
                self.calls.record(&member.user_id, &target, *call_id);
            }
            SignalingMsg::CallDecline { call_id, .. } | SignalingMsg::CallEnd { call_id, .. } => {
                self.calls.clear(&member.user_id, &target, *call_id);
            }
            _ => {}
        }

        let out_msgs = self.deliver_to_user(&target, &msg);
        if out_msgs.is_empty() {
            sink_warn!(
                self.log,
                "dropping {} from {}: target {} is offline",
                msg.name(),
                member.user_id,
                target
            );
        } else {
            sink_trace!(
                self.log,
                "relayed {} {} -> {} ({} connections)",
                msg.name(),
                member.user_id,
                target,
                out_msgs.len()
            );
        }
        out_msgs
    }

    fn deliver_to_user(&self, user_id: &str, msg: &SignalingMsg) -> Vec<OutgoingMsg> {
        self.rooms
            .clients_in(&RoomKey::Private(user_id.to_owned()))
            .into_iter()
            .map(|c| OutgoingMsg::to(c, msg.clone()))
            .collect()
    }

    fn peer_left_broadcast(&self, room_id: &str, member: &Member) -> Vec<OutgoingMsg> {
        let msg = SignalingMsg::PeerLeft {
            room_id: room_id.to_owned(),
            user_id: member.user_id.clone(),
            username: member.username.clone(),
        };
        self.rooms
            .clients_in(&RoomKey::Group(room_id.to_owned()))
            .into_iter()
            .map(|c| OutgoingMsg::to(c, msg.clone()))
            .collect()
    }
}

fn auth_refusal(client: ClientId, err: AuthError) -> OutgoingMsg {
    OutgoingMsg::closing(
        client,
        SignalingMsg::AuthErr {
            code: err.code().as_u16(),
        },
    )
}

fn join_refusal(client: ClientId, room_id: RoomId, code: JoinErrorCode) -> OutgoingMsg {
    OutgoingMsg::to(
        client,
        SignalingMsg::JoinErr {
            room_id,
            code: code.as_u16(),
        },
    )
}

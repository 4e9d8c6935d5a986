// ---- Public message enum --------------------------------------------------

use super::{CallId, IceCandidate, Member, RoomId, TrackInfo, UserId, UserName};

/// Every event that crosses the signaling channel.
///
/// `from` fields are filled in by the relay; whatever a client puts there is
/// overwritten before forwarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingMsg {
    // Handshake / auth
    Authenticate {
        token: String,
    },
    AuthOk {
        user_id: UserId,
        username: UserName,
    },
    AuthErr {
        code: u16, // AuthErrorCode
    },

    // Rooms
    JoinRoom {
        room_id: RoomId,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    RoomRoster {
        room_id: RoomId,
        members: Vec<Member>,
    },
    JoinErr {
        room_id: RoomId,
        code: u16, // JoinErrorCode
    },
    PeerJoined {
        room_id: RoomId,
        user_id: UserId,
        username: UserName,
    },
    PeerLeft {
        room_id: RoomId,
        user_id: UserId,
        username: UserName,
    },
    Whisper {
        room_id: RoomId,
        from: UserId,
        target: Option<UserId>,
    },

    // Peer negotiation. `room_id == None` means the private call link.
    Offer {
        from: UserId,
        to: UserId,
        room_id: Option<RoomId>,
        sdp: String,
        tracks: Vec<TrackInfo>,
    },
    Answer {
        from: UserId,
        to: UserId,
        room_id: Option<RoomId>,
        sdp: String,
        tracks: Vec<TrackInfo>,
    },
    IceCandidate {
        from: UserId,
        to: UserId,
        room_id: Option<RoomId>,
        candidate: IceCandidate,
    },

    // Private calls
    CallRequest {
        from: UserId,
        from_username: UserName,
        to: UserId,
        call_id: CallId,
        sdp: String,
        is_video: bool,
        tracks: Vec<TrackInfo>,
    },
    CallAccept {
        from: UserId,
        to: UserId,
        call_id: CallId,
        sdp: String,
        tracks: Vec<TrackInfo>,
    },
    CallDecline {
        from: UserId,
        to: UserId,
        call_id: CallId,
    },
    CallEnd {
        from: UserId,
        to: UserId,
        call_id: CallId,
    },

    // Keepalive
    Ping {
        nonce: u64,
    },
    Pong {
        nonce: u64,
    },
}

impl SignalingMsg {
    /// Target user of a directed event.
    pub fn target(&self) -> Option<&UserId> {
        use SignalingMsg::*;
        match self {
            Offer { to, .. }
            | Answer { to, .. }
            | IceCandidate { to, .. }
            | CallRequest { to, .. }
            | CallAccept { to, .. }
            | CallDecline { to, .. }
            | CallEnd { to, .. } => Some(to),
            _ => None,
        }
    }

    /// Overwrite the sender field of a relayed event.
    pub fn set_sender(&mut self, sender: &str) {
        use SignalingMsg::*;
        match self {
            Offer { from, .. }
            | Answer { from, .. }
            | IceCandidate { from, .. }
            | CallRequest { from, .. }
            | CallAccept { from, .. }
            | CallDecline { from, .. }
            | CallEnd { from, .. }
            | Whisper { from, .. } => {
                sender.clone_into(from);
            }
            _ => {}
        }
    }

    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        use SignalingMsg::*;
        match self {
            Authenticate { .. } => "authenticate",
            AuthOk { .. } => "auth-ok",
            AuthErr { .. } => "auth-err",
            JoinRoom { .. } => "join-room",
            LeaveRoom { .. } => "leave-room",
            RoomRoster { .. } => "room-roster",
            JoinErr { .. } => "join-err",
            PeerJoined { .. } => "peer-joined",
            PeerLeft { .. } => "peer-left",
            Whisper { .. } => "whisper",
            Offer { .. } => "offer",
            Answer { .. } => "answer",
            IceCandidate { .. } => "ice-candidate",
            CallRequest { .. } => "call-request",
            CallAccept { .. } => "call-accept",
            CallDecline { .. } => "call-decline",
            CallEnd { .. } => "call-end",
            Ping { .. } => "ping",
            Pong { .. } => "pong",
        }
    }
}

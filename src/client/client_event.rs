use std::fmt;

use crate::call::CallEvent;
use crate::client::Health;
use crate::peer::PeerUpdate;
use crate::signaling::protocol::Member;
use crate::voice::VoiceEvent;

/// Everything the client runtime reports upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Connected(Member),
    Call(CallEvent),
    Voice(VoiceEvent),
    Health(Health),
    Error(String),
    Disconnected,
}

fn fmt_media(f: &mut fmt::Formatter<'_>, scope: &str, u: &PeerUpdate) -> fmt::Result {
    match u {
        PeerUpdate::LinkState { peer, state } => write!(f, "{scope} link {peer}: {state}"),
        PeerUpdate::TrackAdded { peer, slot, track } => {
            write!(f, "{scope} {peer} {slot} track {} ({})", track.id, track.label)
        }
        PeerUpdate::TrackRemoved {
            peer,
            slot,
            track_id,
        } => write!(f, "{scope} {peer} {slot} track {track_id} gone"),
        PeerUpdate::LinkClosed { peer } => write!(f, "{scope} link {peer} closed"),
    }
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected(m) => write!(f, "connected as {} ({})", m.user_id, m.username),
            Self::Call(CallEvent::Status { status, peer }) => match peer {
                Some(p) => write!(f, "call {status} with {p}"),
                None => write!(f, "call {status}"),
            },
            Self::Call(CallEvent::Incoming {
                from,
                username,
                is_video,
                ..
            }) => {
                let kind = if *is_video { "video" } else { "voice" };
                write!(f, "incoming {kind} call from {from} ({username})")
            }
            Self::Call(CallEvent::Media(u)) => fmt_media(f, "call", u),
            Self::Voice(VoiceEvent::Joined { room_id, roster }) => {
                let names: Vec<&str> = roster.iter().map(|m| m.user_id.as_str()).collect();
                write!(f, "joined {room_id}: [{}]", names.join(", "))
            }
            Self::Voice(VoiceEvent::JoinRefused { room_id, code }) => {
                write!(f, "join {room_id} refused (code {code})")
            }
            Self::Voice(VoiceEvent::PeerJoined { room_id, member }) => {
                write!(f, "{} joined {room_id}", member.user_id)
            }
            Self::Voice(VoiceEvent::PeerLeft { room_id, member }) => {
                write!(f, "{} left {room_id}", member.user_id)
            }
            Self::Voice(VoiceEvent::Whisper { from, target }) => match target {
                Some(t) => write!(f, "{from} whispers to {t}"),
                None => write!(f, "{from} stopped whispering"),
            },
            Self::Voice(VoiceEvent::Left { room_id }) => write!(f, "left {room_id}"),
            Self::Voice(VoiceEvent::State(s)) => write!(
                f,
                "voice muted={} deafened={} camera={} screen={}",
                s.muted, s.deafened, s.camera, s.screen
            ),
            Self::Voice(VoiceEvent::Media(u)) => fmt_media(f, "voice", u),
            Self::Health(h) => write!(f, "health {h}"),
            Self::Error(e) => write!(f, "error: {e}"),
            Self::Disconnected => f.write_str("disconnected from relay"),
        }
    }
}

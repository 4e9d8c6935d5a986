use std::fmt;

use super::ProtoError;

// ---- Basic types ----------------------------------------------------------

pub type UserId = String;
pub type UserName = String;
pub type RoomId = String;
/// Identifies one private call attempt between two users.
pub type CallId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Member {
    pub user_id: UserId,
    pub username: UserName,
}

impl Member {
    pub fn new(user_id: impl Into<UserId>, username: impl Into<UserName>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
        }
    }
}

/// Network-reachability candidate as carried by `IceCandidate` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
        }
    }
}

/// Role a sender assigns to one of its tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TrackKind {
    Audio = 0,
    Camera = 1,
    Screen = 2,
}

impl TrackKind {
    pub fn from_u8(v: u8) -> Result<Self, ProtoError> {
        match v {
            0 => Ok(Self::Audio),
            1 => Ok(Self::Camera),
            2 => Ok(Self::Screen),
            other => Err(ProtoError::UnknownTrackKind(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_video(self) -> bool {
        !matches!(self, Self::Audio)
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Audio => "audio",
            Self::Camera => "camera",
            Self::Screen => "screen",
        };
        f.write_str(s)
    }
}

/// Announcement of one outgoing track, attached to offers and answers so the
/// receiver does not have to guess the track's role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub track_id: String,
    pub stream_id: String,
    pub kind: TrackKind,
}

use std::str;

use byteorder::{BigEndian, ByteOrder};

use super::{IceCandidate, Member, MsgType, ProtoError, SignalingMsg, TrackInfo, TrackKind};

// ---- Encode to body bytes -------------------------------------------------

pub fn encode_msg(msg: &SignalingMsg) -> Result<(MsgType, Vec<u8>), ProtoError> {
    use SignalingMsg::*;
    let mut body = Vec::new();

    let msg_type = match msg {
        Authenticate { token } => {
            put_str16(&mut body, token)?;
            MsgType::Authenticate
        }
        AuthOk { user_id, username } => {
            put_str16(&mut body, user_id)?;
            put_str16(&mut body, username)?;
            MsgType::AuthOk
        }
        AuthErr { code } => {
            put_u16(&mut body, *code);
            MsgType::AuthErr
        }

        JoinRoom { room_id } => {
            put_str16(&mut body, room_id)?;
            MsgType::JoinRoom
        }
        LeaveRoom { room_id } => {
            put_str16(&mut body, room_id)?;
            MsgType::LeaveRoom
        }
        RoomRoster { room_id, members } => {
            put_str16(&mut body, room_id)?;
            put_count(&mut body, members.len())?;
            for m in members {
                put_str16(&mut body, &m.user_id)?;
                put_str16(&mut body, &m.username)?;
            }
            MsgType::RoomRoster
        }
        JoinErr { room_id, code } => {
            put_str16(&mut body, room_id)?;
            put_u16(&mut body, *code);
            MsgType::JoinErr
        }
        PeerJoined {
            room_id,
            user_id,
            username,
        } => {
            put_str16(&mut body, room_id)?;
            put_str16(&mut body, user_id)?;
            put_str16(&mut body, username)?;
            MsgType::PeerJoined
        }
        PeerLeft {
            room_id,
            user_id,
            username,
        } => {
            put_str16(&mut body, room_id)?;
            put_str16(&mut body, user_id)?;
            put_str16(&mut body, username)?;
            MsgType::PeerLeft
        }
        Whisper {
            room_id,
            from,
            target,
        } => {
            put_str16(&mut body, room_id)?;
            put_str16(&mut body, from)?;
            put_opt_str16(&mut body, target.as_deref())?;
            MsgType::Whisper
        }

        Offer {
            from,
            to,
            room_id,
            sdp,
            tracks,
        } => {
            put_description(&mut body, from, to, room_id.as_deref(), sdp, tracks)?;
            MsgType::Offer
        }
        Answer {
            from,
            to,
            room_id,
            sdp,
            tracks,
        } => {
            put_description(&mut body, from, to, room_id.as_deref(), sdp, tracks)?;
            MsgType::Answer
        }
        IceCandidate {
            from,
            to,
            room_id,
            candidate,
        } => {
            put_str16(&mut body, from)?;
            put_str16(&mut body, to)?;
            put_opt_str16(&mut body, room_id.as_deref())?;
            put_str16(&mut body, &candidate.candidate)?;
            put_opt_str16(&mut body, candidate.sdp_mid.as_deref())?;
            match candidate.sdp_mline_index {
                Some(idx) => {
                    put_u8(&mut body, 1);
                    put_u16(&mut body, idx);
                }
                None => put_u8(&mut body, 0),
            }
            MsgType::IceCandidate
        }

        CallRequest {
            from,
            from_username,
            to,
            call_id,
            sdp,
            is_video,
            tracks,
        } => {
            put_str16(&mut body, from)?;
            put_str16(&mut body, from_username)?;
            put_str16(&mut body, to)?;
            put_u64(&mut body, *call_id);
            put_u8(&mut body, u8::from(*is_video));
            put_blob32(&mut body, sdp.as_bytes())?;
            put_tracks(&mut body, tracks)?;
            MsgType::CallRequest
        }
        CallAccept {
            from,
            to,
            call_id,
            sdp,
            tracks,
        } => {
            put_str16(&mut body, from)?;
            put_str16(&mut body, to)?;
            put_u64(&mut body, *call_id);
            put_blob32(&mut body, sdp.as_bytes())?;
            put_tracks(&mut body, tracks)?;
            MsgType::CallAccept
        }
        CallDecline { from, to, call_id } => {
            put_str16(&mut body, from)?;
            put_str16(&mut body, to)?;
            put_u64(&mut body, *call_id);
            MsgType::CallDecline
        }
        CallEnd { from, to, call_id } => {
            put_str16(&mut body, from)?;
            put_str16(&mut body, to)?;
            put_u64(&mut body, *call_id);
            MsgType::CallEnd
        }

        Ping { nonce } => {
            put_u64(&mut body, *nonce);
            MsgType::Ping
        }
        Pong { nonce } => {
            put_u64(&mut body, *nonce);
            MsgType::Pong
        }
    };

    Ok((msg_type, body))
}

// ---- Decode from body bytes ----------------------------------------------

pub fn decode_msg(msg_type: MsgType, body: &[u8]) -> Result<SignalingMsg, ProtoError> {
    use SignalingMsg::*;
    let mut cursor = Cursor::new(body);

    let msg = match msg_type {
        MsgType::Authenticate => Authenticate {
            token: cursor.get_string()?,
        },
        MsgType::AuthOk => AuthOk {
            user_id: cursor.get_string()?,
            username: cursor.get_string()?,
        },
        MsgType::AuthErr => AuthErr {
            code: cursor.get_u16()?,
        },

        MsgType::JoinRoom => JoinRoom {
            room_id: cursor.get_string()?,
        },
        MsgType::LeaveRoom => LeaveRoom {
            room_id: cursor.get_string()?,
        },
        MsgType::RoomRoster => {
            let room_id = cursor.get_string()?;
            let n = cursor.get_u16()? as usize;
            let mut members = Vec::with_capacity(n);
            for _ in 0..n {
                let user_id = cursor.get_string()?;
                let username = cursor.get_string()?;
                members.push(Member { user_id, username });
            }
            RoomRoster { room_id, members }
        }
        MsgType::JoinErr => JoinErr {
            room_id: cursor.get_string()?,
            code: cursor.get_u16()?,
        },
        MsgType::PeerJoined => PeerJoined {
            room_id: cursor.get_string()?,
            user_id: cursor.get_string()?,
            username: cursor.get_string()?,
        },
        MsgType::PeerLeft => PeerLeft {
            room_id: cursor.get_string()?,
            user_id: cursor.get_string()?,
            username: cursor.get_string()?,
        },
        MsgType::Whisper => Whisper {
            room_id: cursor.get_string()?,
            from: cursor.get_string()?,
            target: cursor.get_opt_string()?,
        },

        MsgType::Offer => {
            let (from, to, room_id, sdp, tracks) = cursor.get_description()?;
            Offer {
                from,
                to,
                room_id,
                sdp,
                tracks,
            }
        }
        MsgType::Answer => {
            let (from, to, room_id, sdp, tracks) = cursor.get_description()?;
            Answer {
                from,
                to,
                room_id,
                sdp,
                tracks,
            }
        }
        MsgType::IceCandidate => {
            let from = cursor.get_string()?;
            let to = cursor.get_string()?;
            let room_id = cursor.get_opt_string()?;
            let candidate = cursor.get_string()?;
            let sdp_mid = cursor.get_opt_string()?;
            let sdp_mline_index = match cursor.get_u8()? {
                0 => None,
                1 => Some(cursor.get_u16()?),
                _ => return Err(ProtoError::InvalidFormat("bad option tag")),
            };
            IceCandidate {
                from,
                to,
                room_id,
                candidate: super::IceCandidate {
                    candidate,
                    sdp_mid,
                    sdp_mline_index,
                },
            }
        }

        MsgType::CallRequest => CallRequest {
            from: cursor.get_string()?,
            from_username: cursor.get_string()?,
            to: cursor.get_string()?,
            call_id: cursor.get_u64()?,
            is_video: cursor.get_bool()?,
            sdp: cursor.get_blob32_string()?,
            tracks: cursor.get_tracks()?,
        },
        MsgType::CallAccept => CallAccept {
            from: cursor.get_string()?,
            to: cursor.get_string()?,
            call_id: cursor.get_u64()?,
            sdp: cursor.get_blob32_string()?,
            tracks: cursor.get_tracks()?,
        },
        MsgType::CallDecline => CallDecline {
            from: cursor.get_string()?,
            to: cursor.get_string()?,
            call_id: cursor.get_u64()?,
        },
        MsgType::CallEnd => CallEnd {
            from: cursor.get_string()?,
            to: cursor.get_string()?,
            call_id: cursor.get_u64()?,
        },

        MsgType::Ping => Ping {
            nonce: cursor.get_u64()?,
        },
        MsgType::Pong => Pong {
            nonce: cursor.get_u64()?,
        },
    };

    cursor.finish()?;
    Ok(msg)
}

// ---- Primitive write helpers ---------------------------------------------

fn put_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    let mut b = [0u8; 2];
    BigEndian::write_u16(&mut b, v);
    buf.extend_from_slice(&b);
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    let mut b = [0u8; 4];
    BigEndian::write_u32(&mut b, v);
    buf.extend_from_slice(&b);
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    let mut b = [0u8; 8];
    BigEndian::write_u64(&mut b, v);
    buf.extend_from_slice(&b);
}

/// str16 = u16 length + UTF-8 bytes
fn put_str16(buf: &mut Vec<u8>, s: &str) -> Result<(), ProtoError> {
    let len = u16::try_from(s.len()).map_err(|_| ProtoError::StringTooLong {
        max: u16::MAX as usize,
        actual: s.len(),
    })?;
    put_u16(buf, len);
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

/// u8 presence tag, then str16 when present.
fn put_opt_str16(buf: &mut Vec<u8>, s: Option<&str>) -> Result<(), ProtoError> {
    match s {
        Some(s) => {
            put_u8(buf, 1);
            put_str16(buf, s)
        }
        None => {
            put_u8(buf, 0);
            Ok(())
        }
    }
}

fn put_blob32(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<(), ProtoError> {
    let len = u32::try_from(bytes.len()).map_err(|_| ProtoError::TooLarge {
        len: bytes.len(),
        max: u32::MAX as usize,
    })?;
    put_u32(buf, len);
    buf.extend_from_slice(bytes);
    Ok(())
}

fn put_count(buf: &mut Vec<u8>, n: usize) -> Result<(), ProtoError> {
    let n = u16::try_from(n).map_err(|_| ProtoError::InvalidFormat("list too long"))?;
    put_u16(buf, n);
    Ok(())
}

fn put_tracks(buf: &mut Vec<u8>, tracks: &[TrackInfo]) -> Result<(), ProtoError> {
    put_count(buf, tracks.len())?;
    for t in tracks {
        put_str16(buf, &t.track_id)?;
        put_str16(buf, &t.stream_id)?;
        put_u8(buf, t.kind.as_u8());
    }
    Ok(())
}

fn put_description(
    buf: &mut Vec<u8>,
    from: &str,
    to: &str,
    room_id: Option<&str>,
    sdp: &str,
    tracks: &[TrackInfo],
) -> Result<(), ProtoError> {
    put_str16(buf, from)?;
    put_str16(buf, to)?;
    put_opt_str16(buf, room_id)?;
    put_blob32(buf, sdp.as_bytes())?;
    put_tracks(buf, tracks)
}

// ---- Cursor for decoding --------------------------------------------------

type Description = (String, String, Option<String>, String, Vec<TrackInfo>);

#[derive(Debug)]
struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn get_bytes(&mut self, len: usize) -> Result<&'a [u8], ProtoError> {
        if self.buf.len() < len {
            return Err(ProtoError::Truncated);
        }
        let (head, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(head)
    }

    fn get_u8(&mut self) -> Result<u8, ProtoError> {
        Ok(self.get_bytes(1)?[0])
    }

    fn get_bool(&mut self) -> Result<bool, ProtoError> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ProtoError::InvalidFormat("bad bool")),
        }
    }

    fn get_u16(&mut self) -> Result<u16, ProtoError> {
        Ok(BigEndian::read_u16(self.get_bytes(2)?))
    }

    fn get_u32(&mut self) -> Result<u32, ProtoError> {
        Ok(BigEndian::read_u32(self.get_bytes(4)?))
    }

    fn get_u64(&mut self) -> Result<u64, ProtoError> {
        Ok(BigEndian::read_u64(self.get_bytes(8)?))
    }

    /// Read str16 = u16 length + UTF-8 bytes
    fn get_str16(&mut self) -> Result<&'a str, ProtoError> {
        let len = self.get_u16()? as usize;
        let bytes = self.get_bytes(len)?;
        str::from_utf8(bytes).map_err(|_| ProtoError::InvalidUtf8)
    }

    fn get_string(&mut self) -> Result<String, ProtoError> {
        self.get_str16().map(str::to_owned)
    }

    fn get_opt_string(&mut self) -> Result<Option<String>, ProtoError> {
        match self.get_u8()? {
            0 => Ok(None),
            1 => self.get_string().map(Some),
            _ => Err(ProtoError::InvalidFormat("bad option tag")),
        }
    }

    fn get_blob32_string(&mut self) -> Result<String, ProtoError> {
        let len = self.get_u32()? as usize;
        let bytes = self.get_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ProtoError::InvalidUtf8)
    }

    fn get_tracks(&mut self) -> Result<Vec<TrackInfo>, ProtoError> {
        let n = self.get_u16()? as usize;
        let mut tracks = Vec::with_capacity(n);
        for _ in 0..n {
            let track_id = self.get_string()?;
            let stream_id = self.get_string()?;
            let kind = TrackKind::from_u8(self.get_u8()?)?;
            tracks.push(TrackInfo {
                track_id,
                stream_id,
                kind,
            });
        }
        Ok(tracks)
    }

    fn get_description(&mut self) -> Result<Description, ProtoError> {
        let from = self.get_string()?;
        let to = self.get_string()?;
        let room_id = self.get_opt_string()?;
        let sdp = self.get_blob32_string()?;
        let tracks = self.get_tracks()?;
        Ok((from, to, room_id, sdp, tracks))
    }

    /// Enforce that we've consumed the whole body.
    fn finish(self) -> Result<(), ProtoError> {
        if !self.buf.is_empty() {
            Err(ProtoError::InvalidFormat("trailing bytes in message body"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn roundtrip(msg: SignalingMsg) {
        let (ty, body) = encode_msg(&msg).unwrap();
        assert_eq!(decode_msg(ty, &body).unwrap(), msg);
    }

    #[test]
    fn offer_with_tracks_and_room() {
        roundtrip(SignalingMsg::Offer {
            from: "alice".into(),
            to: "bob".into(),
            room_id: Some("r1".into()),
            sdp: "v=0\r\n".into(),
            tracks: vec![
                TrackInfo {
                    track_id: "a1".into(),
                    stream_id: "s1".into(),
                    kind: TrackKind::Audio,
                },
                TrackInfo {
                    track_id: "v1".into(),
                    stream_id: "screen-s2".into(),
                    kind: TrackKind::Screen,
                },
            ],
        });
    }

    #[test]
    fn candidate_optional_fields() {
        roundtrip(SignalingMsg::IceCandidate {
            from: String::new(),
            to: "bob".into(),
            room_id: None,
            candidate: IceCandidate {
                candidate: "candidate:1 1 UDP 1 10.0.0.1 5000 typ host".into(),
                sdp_mid: Some("0".into()),
                sdp_mline_index: None,
            },
        });
    }

    #[test]
    fn roster_and_call_request() {
        roundtrip(SignalingMsg::RoomRoster {
            room_id: "r1".into(),
            members: vec![Member::new("u1", "alice"), Member::new("u2", "bob")],
        });
        roundtrip(SignalingMsg::CallRequest {
            from: "u1".into(),
            from_username: "alice".into(),
            to: "u2".into(),
            call_id: 42,
            sdp: "v=0".into(),
            is_video: true,
            tracks: vec![],
        });
    }

    #[test]
    fn rejects_trailing_and_truncated_bodies() {
        let (ty, mut body) = encode_msg(&SignalingMsg::Ping { nonce: 7 }).unwrap();
        body.push(0);
        assert!(matches!(
            decode_msg(ty, &body),
            Err(ProtoError::InvalidFormat(_))
        ));
        assert!(matches!(
            decode_msg(MsgType::Pong, &[0, 1]),
            Err(ProtoError::Truncated)
        ));
    }

    #[test]
    fn rejects_unknown_track_kind() {
        let (ty, mut body) = encode_msg(&SignalingMsg::CallAccept {
            from: "a".into(),
            to: "b".into(),
            call_id: 1,
            sdp: String::new(),
            tracks: vec![TrackInfo {
                track_id: "t".into(),
                stream_id: "s".into(),
                kind: TrackKind::Camera,
            }],
        })
        .unwrap();
        let last = body.len() - 1;
        body[last] = 9;
        assert!(matches!(
            decode_msg(ty, &body),
            Err(ProtoError::UnknownTrackKind(9))
        ));
    }
}

use super::ProtoError;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum MsgType {
    Authenticate = 0x01,
    AuthOk = 0x02,
    AuthErr = 0x03,

    JoinRoom = 0x10,
    LeaveRoom = 0x11,
    RoomRoster = 0x12,
    JoinErr = 0x13,
    PeerJoined = 0x14,
    PeerLeft = 0x15,
    Whisper = 0x16,

    Offer = 0x20,
    Answer = 0x21,
    IceCandidate = 0x22,

    CallRequest = 0x28,
    CallAccept = 0x29,
    CallDecline = 0x2a,
    CallEnd = 0x2b,

    Ping = 0x30,
    Pong = 0x31,
}

impl MsgType {
    pub fn from_u8(v: u8) -> Result<MsgType, ProtoError> {
        use MsgType::*;
        match v {
            0x01 => Ok(Authenticate),
            0x02 => Ok(AuthOk),
            0x03 => Ok(AuthErr),
            0x10 => Ok(JoinRoom),
            0x11 => Ok(LeaveRoom),
            0x12 => Ok(RoomRoster),
            0x13 => Ok(JoinErr),
            0x14 => Ok(PeerJoined),
            0x15 => Ok(PeerLeft),
            0x16 => Ok(Whisper),
            0x20 => Ok(Offer),
            0x21 => Ok(Answer),
            0x22 => Ok(IceCandidate),
            0x28 => Ok(CallRequest),
            0x29 => Ok(CallAccept),
            0x2a => Ok(CallDecline),
            0x2b => Ok(CallEnd),
            0x30 => Ok(Ping),
            0x31 => Ok(Pong),
            other => Err(ProtoError::UnknownType(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

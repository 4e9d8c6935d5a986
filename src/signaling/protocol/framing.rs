use std::io::{self, Read, Write};

use bytes::{Buf, BytesMut};

use super::{
    FrameError, HEADER_LEN, MsgType, PROTO_VERSION, ProtoError, SignalingMsg, decode_msg,
    encode_msg,
};

fn header(msg_type: MsgType, body_len: usize) -> io::Result<[u8; HEADER_LEN]> {
    let len = u32::try_from(body_len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "body too large"))?;
    let mut header = [0u8; HEADER_LEN];
    header[0] = PROTO_VERSION;
    header[1] = msg_type.as_u8();
    // flags (u16) reserved, left at zero
    header[4..8].copy_from_slice(&len.to_be_bytes());
    Ok(header)
}

/// Write a single frame: [ver][type][reserved u16=0][len u32][body...]
pub fn write_frame<W: Write>(w: &mut W, msg_type: MsgType, body: &[u8]) -> io::Result<()> {
    w.write_all(&header(msg_type, body.len())?)?;
    w.write_all(body)?;
    w.flush()
}

/// Encode and write one message.
pub fn write_msg<W: Write>(w: &mut W, msg: &SignalingMsg) -> Result<(), FrameError> {
    let (ty, body) = encode_msg(msg)?;
    write_frame(w, ty, &body)?;
    Ok(())
}

/// Encode one message into a complete frame.
pub fn encode_frame(msg: &SignalingMsg) -> Result<Vec<u8>, FrameError> {
    let (ty, body) = encode_msg(msg)?;
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&header(ty, body.len())?);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Read a single frame, enforcing a max body length.
pub fn read_frame<R: Read>(r: &mut R, max_body: usize) -> Result<(MsgType, Vec<u8>), FrameError> {
    let mut header = [0u8; HEADER_LEN];
    r.read_exact(&mut header)?;

    if header[0] != PROTO_VERSION {
        return Err(ProtoError::UnsupportedVersion(header[0]).into());
    }
    let msg_type = MsgType::from_u8(header[1])?;

    // flags ignored for now
    let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
    if len > max_body {
        return Err(ProtoError::TooLarge { len, max: max_body }.into());
    }

    let mut body = vec![0u8; len];
    r.read_exact(&mut body)?;

    Ok((msg_type, body))
}

/// Incremental decoder for non-blocking / timed-out reads: bytes are pushed
/// in as they arrive and complete messages are pulled out.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_body: usize,
}

impl FrameDecoder {
    pub fn new(max_body: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            max_body,
        }
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete message, `Ok(None)` if more bytes are needed.
    ///
    /// A header error leaves the stream unsynchronised; callers should drop
    /// the connection.
    pub fn next_msg(&mut self) -> Result<Option<SignalingMsg>, FrameError> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let ver = self.buf[0];
        if ver != PROTO_VERSION {
            return Err(ProtoError::UnsupportedVersion(ver).into());
        }
        let msg_type = MsgType::from_u8(self.buf[1])?;
        let len = u32::from_be_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]]) as usize;
        if len > self.max_body {
            return Err(ProtoError::TooLarge {
                len,
                max: self.max_body,
            }
            .into());
        }
        if self.buf.len() < HEADER_LEN + len {
            return Ok(None);
        }
        self.buf.advance(HEADER_LEN);
        let body = self.buf.split_to(len).freeze();
        Ok(Some(decode_msg(msg_type, &body)?))
    }
}

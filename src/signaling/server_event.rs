use std::sync::mpsc::Sender;

use crate::signaling::{
    protocol::SignalingMsg,
    types::{ClientId, ToClient},
};

/// Input of the central relay loop. Connection threads only ever talk to
/// the loop through these, so relay state stays single-threaded.
#[derive(Debug)]
pub enum ServerEvent {
    /// A connection's writer is up; frames for `client_id` go to `to_client`.
    RegisterClient {
        client_id: ClientId,
        to_client: Sender<ToClient>,
    },

    /// One decoded frame from a connection.
    MsgFromClient { client_id: ClientId, msg: SignalingMsg },

    /// Reader hit EOF, an IO error or a protocol error.
    Disconnected { client_id: ClientId },
}

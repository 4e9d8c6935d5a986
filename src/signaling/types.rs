use crate::signaling::protocol::SignalingMsg;

/// Internal identifier for a connected client (TCP/TLS connection).
pub type ClientId = u64;

/// What a connection's writer thread is asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToClient {
    Msg(SignalingMsg),
    /// Flush what is queued, then shut the connection down.
    Close,
}

/// A message the server wants to send to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMsg {
    pub client_id_target: ClientId,
    pub msg: SignalingMsg,
    /// Close the connection once `msg` is written.
    pub close_after: bool,
}

impl OutgoingMsg {
    pub fn to(client_id_target: ClientId, msg: SignalingMsg) -> Self {
        Self {
            client_id_target,
            msg,
            close_after: false,
        }
    }

    pub fn closing(client_id_target: ClientId, msg: SignalingMsg) -> Self {
        Self {
            client_id_target,
            msg,
            close_after: true,
        }
    }
}

use crate::signaling::protocol::SignalingMsg;

/// What the network side hands to the client runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingEvent {
    Msg(SignalingMsg),
    /// The channel is gone (EOF, IO error or protocol error).
    Disconnected,
}

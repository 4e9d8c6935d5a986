use crate::signaling::protocol::SignalingMsg;
use crate::signaling_client::SignalingClientError;

/// Outbound half of the signaling channel as seen by the client-side state
/// machines. Fire-and-forget: `Ok` only means the message was queued.
pub trait SignalingChannel: Send + Sync {
    fn send(&self, msg: SignalingMsg) -> Result<(), SignalingClientError>;
}

pub mod recording_channel;
pub mod signaling_channel;
pub mod signaling_client_c;
pub mod signaling_client_error;
pub mod signaling_event;
pub use recording_channel::RecordingChannel;
pub use signaling_channel::SignalingChannel;
pub use signaling_client_c::{ClientTransportSettings, SignalingClient, SignalingSender};
pub use signaling_client_error::SignalingClientError;
pub use signaling_event::SignalingEvent;

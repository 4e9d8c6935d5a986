mod codec;
mod constants;
mod errors;
mod framing;
mod msg;
mod msg_type;
mod types;

pub use codec::{decode_msg, encode_msg};
pub use constants::*;
pub use errors::{FrameError, ProtoError};
pub use framing::{FrameDecoder, encode_frame, read_frame, write_frame, write_msg};
pub use msg::SignalingMsg;
pub use msg_type::MsgType;
pub use types::*;

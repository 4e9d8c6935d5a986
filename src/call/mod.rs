//! Private 1:1 calls on top of the peer orchestrator.
pub mod call_error;
pub mod call_session;
pub mod call_status;

pub use call_error::CallError;
pub use call_session::{ActiveCall, CallEvent, CallSession};
pub use call_status::CallStatus;

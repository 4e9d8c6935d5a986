//! Group voice rooms: a full mesh of peer links to every other member.
pub mod voice_error;
pub mod voice_session;

pub use voice_error::VoiceError;
pub use voice_session::{GroupVoiceSession, VoiceEvent, VoiceState};

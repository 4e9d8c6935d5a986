//! Compact SDP model: just what mesh negotiation needs (one m-section per
//! track, `a=mid`, `a=msid`, ICE credentials, BUNDLE), with a round-tripping
//! text form.
pub mod attribute;
pub mod media;
pub mod sdp_error;
pub mod session_description;

pub use attribute::Attribute;
pub use media::{Direction, MediaKind, MediaSection};
pub use sdp_error::SdpError;
pub use session_description::SessionDescription;

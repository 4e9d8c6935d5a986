//! Local capture seam and track types.
pub mod media_devices;
pub mod media_error;
pub mod synthetic_media_devices;
pub mod track;

pub use crate::signaling::protocol::TrackKind;
pub use media_devices::{MediaDevices, acquire_video};
pub use media_error::MediaAcquisitionError;
pub use synthetic_media_devices::SyntheticMediaDevices;
pub use track::{LocalTrack, RemoteTrack};

use crate::media::{LocalTrack, MediaAcquisitionError, TrackKind};

/// Capture devices. Acquisition blocks until the user grants or refuses
/// access; callers must not change state before it returns.
pub trait MediaDevices: Send + Sync {
    /// Microphone and/or camera. Returns one track per requested kind.
    fn acquire_user_media(
        &self,
        audio: bool,
        video: bool,
    ) -> Result<Vec<LocalTrack>, MediaAcquisitionError>;

    /// A screen-capture video track.
    fn acquire_display_media(&self) -> Result<LocalTrack, MediaAcquisitionError>;

    /// Stop capturing a track.
    fn release(&self, track: &LocalTrack);
}

/// One camera or screen-capture track.
pub fn acquire_video(
    devices: &dyn MediaDevices,
    kind: TrackKind,
) -> Result<LocalTrack, MediaAcquisitionError> {
    match kind {
        TrackKind::Screen => devices.acquire_display_media(),
        TrackKind::Camera | TrackKind::Audio => devices
            .acquire_user_media(false, true)?
            .pop()
            .ok_or(MediaAcquisitionError::DeviceUnavailable("camera")),
    }
}

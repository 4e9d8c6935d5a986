use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;

use crate::media::{LocalTrack, MediaAcquisitionError, MediaDevices, TrackKind};

/// Device layer without hardware: hands out tagged tracks and can be told to
/// refuse, for headless clients and tests.
#[derive(Debug, Default)]
pub struct SyntheticMediaDevices {
    deny_user_media: AtomicBool,
    camera_missing: AtomicBool,
    deny_display: AtomicBool,
    live: Mutex<HashSet<String>>,
}

fn short_id() -> String {
    format!("{:08x}", rand::thread_rng().r#gen::<u32>())
}

impl SyntheticMediaDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse microphone/camera permission from now on.
    pub fn set_deny_user_media(&self, deny: bool) {
        self.deny_user_media.store(deny, Ordering::SeqCst);
    }

    pub fn set_camera_missing(&self, missing: bool) {
        self.camera_missing.store(missing, Ordering::SeqCst);
    }

    pub fn set_deny_display(&self, deny: bool) {
        self.deny_display.store(deny, Ordering::SeqCst);
    }

    /// Tracks handed out and not yet released.
    pub fn live_track_count(&self) -> usize {
        self.live.lock().map(|l| l.len()).unwrap_or_default()
    }

    fn track_out(&self, track: LocalTrack) -> LocalTrack {
        if let Ok(mut live) = self.live.lock() {
            live.insert(track.id.clone());
        }
        track
    }
}

impl MediaDevices for SyntheticMediaDevices {
    fn acquire_user_media(
        &self,
        audio: bool,
        video: bool,
    ) -> Result<Vec<LocalTrack>, MediaAcquisitionError> {
        if self.deny_user_media.load(Ordering::SeqCst) {
            return Err(MediaAcquisitionError::PermissionDenied(if video {
                "camera"
            } else {
                "microphone"
            }));
        }
        if video && self.camera_missing.load(Ordering::SeqCst) {
            return Err(MediaAcquisitionError::DeviceUnavailable("camera"));
        }

        let stream_id = format!("stream-{}", short_id());
        let mut tracks = Vec::new();
        if audio {
            tracks.push(self.track_out(LocalTrack::new(
                format!("audio-{}", short_id()),
                stream_id.clone(),
                "Synthetic microphone",
                TrackKind::Audio,
            )));
        }
        if video {
            tracks.push(self.track_out(LocalTrack::new(
                format!("camera-{}", short_id()),
                stream_id,
                "Synthetic camera",
                TrackKind::Camera,
            )));
        }
        Ok(tracks)
    }

    fn acquire_display_media(&self) -> Result<LocalTrack, MediaAcquisitionError> {
        if self.deny_display.load(Ordering::SeqCst) {
            return Err(MediaAcquisitionError::PermissionDenied("screen"));
        }
        Ok(self.track_out(LocalTrack::new(
            format!("display-{}", short_id()),
            format!("screen-{}", short_id()),
            "Screen 1",
            TrackKind::Screen,
        )))
    }

    fn release(&self, track: &LocalTrack) {
        if let Ok(mut live) = self.live.lock() {
            live.remove(&track.id);
        }
    }
}

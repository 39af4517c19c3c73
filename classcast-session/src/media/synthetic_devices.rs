use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use crate::media::{
    DeviceError, MediaConstraints, MediaDevices, MediaStream, MediaTrack, TrackSource,
};

/// Headless test-pattern devices.
///
/// Switches let callers simulate a denied permission prompt, a machine
/// without capture hardware, or a user dismissing the screen picker.
#[derive(Debug, Default)]
pub struct SyntheticDevices {
    deny_permission: AtomicBool,
    no_devices: AtomicBool,
    cancel_display: AtomicBool,
    displays_opened: AtomicUsize,
}

impl SyntheticDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_permission_denied(&self, denied: bool) {
        self.deny_permission.store(denied, Ordering::Relaxed);
    }

    pub fn set_no_devices(&self, missing: bool) {
        self.no_devices.store(missing, Ordering::Relaxed);
    }

    pub fn set_display_cancelled(&self, cancelled: bool) {
        self.cancel_display.store(cancelled, Ordering::Relaxed);
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaStream, DeviceError> {
        if self.deny_permission.load(Ordering::Relaxed) {
            return Err(DeviceError::PermissionDenied);
        }
        if self.no_devices.load(Ordering::Relaxed) {
            return Err(DeviceError::NotFound);
        }

        let stream_id = format!("camera-{}", Uuid::new_v4());
        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.push(Arc::new(MediaTrack::new(
                TrackSource::Microphone,
                "Synthetic Microphone",
                stream_id.clone(),
            )));
        }
        if constraints.video {
            tracks.push(Arc::new(MediaTrack::new(
                TrackSource::Camera,
                "Synthetic Camera",
                stream_id.clone(),
            )));
        }
        Ok(MediaStream::new(stream_id, tracks))
    }

    async fn get_display_media(&self) -> Result<MediaStream, DeviceError> {
        if self.cancel_display.load(Ordering::Relaxed) {
            return Err(DeviceError::Cancelled);
        }

        let n = self.displays_opened.fetch_add(1, Ordering::Relaxed) + 1;
        let stream_id = format!("screen-{}", Uuid::new_v4());
        let track = MediaTrack::new(
            TrackSource::Screen,
            format!("Synthetic Screen {}", n),
            stream_id.clone(),
        );
        Ok(MediaStream::new(stream_id, vec![Arc::new(track)]))
    }
}

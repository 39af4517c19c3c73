use async_trait::async_trait;
use thiserror::Error;

use crate::media::MediaStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("permission to capture was denied")]
    PermissionDenied,

    #[error("no capture device found")]
    NotFound,

    #[error("capture was cancelled by the user")]
    Cancelled,

    #[error("capture device unavailable: {0}")]
    Unavailable(String),
}

/// Platform capture collaborator: camera/microphone and screen/window capture.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaStream, DeviceError>;

    async fn get_display_media(&self) -> Result<MediaStream, DeviceError>;
}

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::media::{
    DeviceError, MediaConstraints, MediaDevices, MediaStream, MediaTrack, TrackId, TrackKind,
    TrackSource,
};

#[derive(Debug, Clone, Default)]
pub struct LocalMediaState {
    pub camera_track: Option<Arc<MediaTrack>>,
    pub mic_track: Option<Arc<MediaTrack>>,
    pub screen_track: Option<Arc<MediaTrack>>,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub screen_sharing: bool,
}

impl LocalMediaState {
    /// Tracks a newly created peer connection must start sending.
    pub fn live_tracks(&self) -> Vec<Arc<MediaTrack>> {
        [&self.mic_track, &self.camera_track, &self.screen_track]
            .into_iter()
            .flatten()
            .filter(|t| t.is_live())
            .cloned()
            .collect()
    }
}

/// Notifications the controller raises on its own, outside any call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalMediaEvent {
    /// Capture failed; the session continues without that media.
    DeviceWarning(DeviceError),

    /// The platform ended the screen capture (e.g. its own "stop sharing"
    /// control). The owner should call `stop_screen_share`.
    ScreenShareEnded,
}

/// Owns the camera, microphone and screen capture tracks.
pub struct LocalMediaController {
    devices: Arc<dyn MediaDevices>,
    state: LocalMediaState,
    screen_stream: Option<MediaStream>,
    screen_watch: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<LocalMediaEvent>,
}

impl LocalMediaController {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        events: mpsc::UnboundedSender<LocalMediaEvent>,
    ) -> Self {
        Self {
            devices,
            state: LocalMediaState::default(),
            screen_stream: None,
            screen_watch: None,
            events,
        }
    }

    pub fn state(&self) -> LocalMediaState {
        self.state.clone()
    }

    pub fn live_tracks(&self) -> Vec<Arc<MediaTrack>> {
        self.state.live_tracks()
    }

    /// Requests camera/microphone access.
    ///
    /// Never fails: on denial or missing hardware the state is left empty with
    /// both flags cleared and a [`LocalMediaEvent::DeviceWarning`] is raised.
    pub async fn acquire(&mut self, want_audio: bool, want_video: bool) -> LocalMediaState {
        self.release_user_media();

        if !want_audio && !want_video {
            return self.state.clone();
        }

        let constraints = MediaConstraints {
            audio: want_audio,
            video: want_video,
        };
        match self.devices.get_user_media(constraints).await {
            Ok(stream) => {
                self.state.mic_track = stream.first_of_kind(TrackKind::Audio);
                self.state.camera_track = stream.first_of_kind(TrackKind::Video);
                self.state.audio_enabled = self.state.mic_track.is_some();
                self.state.video_enabled = self.state.camera_track.is_some();
                info!(
                    "Local media acquired (audio: {}, video: {})",
                    self.state.audio_enabled, self.state.video_enabled
                );
            }
            Err(e) => {
                warn!("Joining without local media: {}", e);
                let _ = self.events.send(LocalMediaEvent::DeviceWarning(e));
            }
        }

        self.state.clone()
    }

    pub fn toggle_audio(&mut self) -> bool {
        let Some(track) = &self.state.mic_track else {
            return false;
        };
        let enabled = !self.state.audio_enabled;
        track.set_enabled(enabled);
        self.state.audio_enabled = enabled;
        debug!("Microphone enabled: {}", enabled);
        enabled
    }

    pub fn toggle_video(&mut self) -> bool {
        let Some(track) = &self.state.camera_track else {
            return false;
        };
        let enabled = !self.state.video_enabled;
        track.set_enabled(enabled);
        self.state.video_enabled = enabled;
        debug!("Camera enabled: {}", enabled);
        enabled
    }

    /// Starts a screen/window capture. `None` when the user cancels the
    /// picker or capture is unavailable; an active share is returned as is.
    pub async fn start_screen_share(&mut self) -> Option<MediaStream> {
        if let Some(stream) = &self.screen_stream {
            return Some(stream.clone());
        }

        let stream = match self.devices.get_display_media().await {
            Ok(stream) => stream,
            Err(DeviceError::Cancelled) => {
                info!("Screen share cancelled");
                return None;
            }
            Err(e) => {
                warn!("Screen share unavailable: {}", e);
                let _ = self.events.send(LocalMediaEvent::DeviceWarning(e));
                return None;
            }
        };

        let Some(video) = stream.track(TrackSource::Screen) else {
            warn!("Display capture returned no screen track");
            stream.stop();
            return None;
        };

        let watched = video.clone();
        let events = self.events.clone();
        self.screen_watch = Some(tokio::spawn(async move {
            watched.ended().await;
            debug!("Screen track {} ended outside the app", watched.id());
            let _ = events.send(LocalMediaEvent::ScreenShareEnded);
        }));

        info!("Screen share started ({})", video.label());
        self.state.screen_track = Some(video);
        self.state.screen_sharing = true;
        self.screen_stream = Some(stream.clone());
        Some(stream)
    }

    /// Stops the screen capture and returns the ids of the tracks it ended.
    /// Idempotent.
    pub fn stop_screen_share(&mut self) -> Vec<TrackId> {
        let Some(stream) = self.screen_stream.take() else {
            return Vec::new();
        };

        // Detach first so our own stop is not reported back as a platform stop.
        if let Some(watch) = self.screen_watch.take() {
            watch.abort();
        }
        stream.stop();

        self.state.screen_track = None;
        self.state.screen_sharing = false;
        info!("Screen share stopped");

        stream.tracks.iter().map(|t| t.id()).collect()
    }

    /// Stops every capture. Called on session leave.
    pub fn release(&mut self) {
        self.stop_screen_share();
        self.release_user_media();
    }

    fn release_user_media(&mut self) {
        for track in [self.state.mic_track.take(), self.state.camera_track.take()]
            .into_iter()
            .flatten()
        {
            track.stop();
        }
        self.state.audio_enabled = false;
        self.state.video_enabled = false;
    }
}

impl Drop for LocalMediaController {
    fn drop(&mut self) {
        self.release();
    }
}

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct TrackId(pub Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackSource {
    Microphone,
    Camera,
    Screen,
}

impl TrackSource {
    pub fn kind(self) -> TrackKind {
        match self {
            TrackSource::Microphone => TrackKind::Audio,
            TrackSource::Camera | TrackSource::Screen => TrackKind::Video,
        }
    }

    fn wire_prefix(self) -> &'static str {
        match self {
            TrackSource::Microphone => "mic",
            TrackSource::Camera => "camera",
            TrackSource::Screen => "screen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Ended,
}

/// A local capture track.
///
/// Shared read-only by every peer connection that sends it; only the
/// [`LocalMediaController`](crate::LocalMediaController) stops it.
#[derive(Debug)]
pub struct MediaTrack {
    id: TrackId,
    source: TrackSource,
    label: String,
    stream_id: String,
    enabled: AtomicBool,
    state: watch::Sender<TrackState>,
}

impl MediaTrack {
    pub fn new(source: TrackSource, label: impl Into<String>, stream_id: impl Into<String>) -> Self {
        let (state, _) = watch::channel(TrackState::Live);
        Self {
            id: TrackId::new(),
            source,
            label: label.into(),
            stream_id: stream_id.into(),
            enabled: AtomicBool::new(true),
            state,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn source(&self) -> TrackSource {
        self.source
    }

    pub fn kind(&self) -> TrackKind {
        self.source.kind()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Id announced to remote peers. Carries the source so receivers can
    /// tell a screen capture apart from a camera.
    pub fn wire_id(&self) -> String {
        format!("{}-{}", self.source.wire_prefix(), self.id)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn state(&self) -> TrackState {
        *self.state.borrow()
    }

    pub fn is_live(&self) -> bool {
        self.state() == TrackState::Live
    }

    /// Ends the capture. Idempotent.
    pub fn stop(&self) {
        self.state.send_if_modified(|state| {
            if *state == TrackState::Ended {
                return false;
            }
            *state = TrackState::Ended;
            true
        });
    }

    /// Resolves once the track has ended, whoever stopped it.
    pub async fn ended(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == TrackState::Ended).await;
    }
}

#[derive(Debug, Clone)]
pub struct MediaStream {
    pub id: String,
    pub tracks: Vec<Arc<MediaTrack>>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, tracks: Vec<Arc<MediaTrack>>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn track(&self, source: TrackSource) -> Option<Arc<MediaTrack>> {
        self.tracks.iter().find(|t| t.source() == source).cloned()
    }

    pub fn first_of_kind(&self, kind: TrackKind) -> Option<Arc<MediaTrack>> {
        self.tracks.iter().find(|t| t.kind() == kind).cloned()
    }

    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

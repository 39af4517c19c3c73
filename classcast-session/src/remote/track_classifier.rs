use crate::media::TrackKind;
use crate::remote::RemoteStreamBucket;

const SCREEN_HINTS: [&str; 4] = ["screen", "window", "display", "monitor"];

/// What the transport tells us about an incoming track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: String,
    pub stream_id: String,
    pub kind: TrackKind,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackClass {
    Camera,
    Screen,
}

/// Decides which bucket an incoming track belongs to.
///
/// The transport carries no "this is a screen" flag, so two signals are used:
/// a label naming a screen, window, display or monitor; or a video track
/// arriving while the participant already shows a camera video from a
/// different stream. A video from the same stream as the current camera is a
/// device switch and stays in the camera bucket.
pub fn classify(track: &TrackInfo, bucket: &RemoteStreamBucket) -> TrackClass {
    let label = track.label.to_ascii_lowercase();
    if SCREEN_HINTS.iter().any(|hint| label.contains(hint)) {
        return TrackClass::Screen;
    }

    if track.kind == TrackKind::Video {
        let concurrent_video = bucket.camera.iter().any(|existing| {
            existing.info.kind == TrackKind::Video
                && existing.info.id != track.id
                && existing.info.stream_id != track.stream_id
        });
        if concurrent_video {
            return TrackClass::Screen;
        }
    }

    TrackClass::Camera
}

use classcast_core::ParticipantId;

use crate::media::DeviceError;
use crate::peer::PeerHealth;
use crate::remote::TrackClass;

/// Notifications for the application layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PeerHealthChanged {
        participant: ParticipantId,
        health: PeerHealth,
    },

    RemoteTrackAdded {
        participant: ParticipantId,
        track_id: String,
        class: TrackClass,
    },

    RemoteTrackRemoved {
        participant: ParticipantId,
        track_id: String,
        class: TrackClass,
    },

    /// The connection failed and was torn down; remove the participant's tile.
    ParticipantDropped { participant: ParticipantId },

    /// Non-blocking device problem, e.g. camera permission denied.
    DeviceWarning(DeviceError),

    /// Screen sharing ended, by the user or by the platform.
    ScreenShareStopped,
}

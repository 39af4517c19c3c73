use classcast_core::ParticipantId;
use tokio::sync::oneshot;

use crate::media::LocalMediaState;

/// Requests from a [`crate::SessionHandle`] to the session task.
#[derive(Debug)]
pub enum SessionCommand {
    ToggleAudio { reply: oneshot::Sender<bool> },

    ToggleVideo { reply: oneshot::Sender<bool> },

    /// Replies whether a share is active afterwards.
    StartScreenShare { reply: oneshot::Sender<bool> },

    StopScreenShare { reply: oneshot::Sender<()> },

    LocalMedia { reply: oneshot::Sender<LocalMediaState> },

    Peers { reply: oneshot::Sender<Vec<ParticipantId>> },

    /// Closes every peer, releases media and leaves the relay.
    Leave { reply: oneshot::Sender<()> },
}

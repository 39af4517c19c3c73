use classcast_core::ParticipantId;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::SessionError;
use crate::media::LocalMediaState;
use crate::peer::{PeerStatus, PeerStatusBoard};
use crate::remote::RemoteStreams;
use crate::session::{SessionCommand, SessionEvent};

/// Application-facing control surface of a running session.
#[derive(Clone)]
pub struct SessionHandle {
    local_id: ParticipantId,
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
    remote_streams: RemoteStreams,
    status: PeerStatusBoard,
}

impl SessionHandle {
    pub(crate) fn new(
        local_id: ParticipantId,
        commands: mpsc::Sender<SessionCommand>,
        events: broadcast::Sender<SessionEvent>,
        remote_streams: RemoteStreams,
        status: PeerStatusBoard,
    ) -> Self {
        Self {
            local_id,
            commands,
            events,
            remote_streams,
            status,
        }
    }

    pub fn local_id(&self) -> ParticipantId {
        self.local_id
    }

    /// Returns the new microphone state.
    pub async fn toggle_audio(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::ToggleAudio { reply }).await
    }

    /// Returns the new camera state.
    pub async fn toggle_video(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::ToggleVideo { reply }).await
    }

    /// `Ok(false)` when the user cancelled the picker or capture failed.
    pub async fn start_screen_share(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::StartScreenShare { reply })
            .await
    }

    pub async fn stop_screen_share(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::StopScreenShare { reply })
            .await
    }

    pub async fn local_media(&self) -> Result<LocalMediaState, SessionError> {
        self.request(|reply| SessionCommand::LocalMedia { reply }).await
    }

    /// Participants with an active connection.
    pub async fn peers(&self) -> Result<Vec<ParticipantId>, SessionError> {
        self.request(|reply| SessionCommand::Peers { reply }).await
    }

    pub async fn leave(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Leave { reply }).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn remote_streams(&self) -> &RemoteStreams {
        &self.remote_streams
    }

    pub fn peer_status(&self, participant: &ParticipantId) -> Option<PeerStatus> {
        self.status.get(participant)
    }

    pub fn peer_statuses(&self) -> Vec<(ParticipantId, PeerStatus)> {
        self.status.snapshot()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        response.await.map_err(|_| SessionError::SessionClosed)
    }
}

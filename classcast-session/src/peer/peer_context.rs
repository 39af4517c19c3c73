use classcast_core::ParticipantId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::peer::{PeerNotice, PeerStatusBoard};
use crate::relay::SignalingRelay;
use crate::remote::RemoteStreams;
use crate::session::SessionEvent;

/// Session-wide collaborators every peer needs. Cheap to clone.
#[derive(Clone)]
pub struct PeerContext {
    pub local_id: ParticipantId,
    pub relay: Arc<dyn SignalingRelay>,
    pub remote_streams: RemoteStreams,
    pub status: PeerStatusBoard,
    pub events: broadcast::Sender<SessionEvent>,
    pub notices: mpsc::UnboundedSender<PeerNotice>,
    /// How long a muted remote screen track is kept before it is dropped.
    pub mute_grace: Duration,
}

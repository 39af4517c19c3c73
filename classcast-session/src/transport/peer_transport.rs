use async_trait::async_trait;
use classcast_core::{IceCandidate, ParticipantId, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::media::{MediaTrack, TrackId};
use crate::negotiation::PeerRole;
use crate::transport::{TransportConfig, TransportEvent};

/// One real-time connection to one remote participant.
///
/// Implementations follow the usual offer/answer rules: descriptions are
/// applied in signaling order and candidates need a remote description.
/// Everything the connection observes on its own is reported through the
/// event sender it was created with.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Starts sending a local track. The track itself is never modified.
    async fn add_track(&self, track: Arc<MediaTrack>) -> Result<(), TransportError>;

    /// Stops the sender for a local track.
    async fn remove_track(&self, track_id: TrackId) -> Result<(), TransportError>;

    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_local_description(&self, desc: SessionDescription)
    -> Result<(), TransportError>;

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError>;

    /// Discards the pending local offer. Only the polite side of a pair
    /// ever rolls back, and a transport may refuse it for the other side.
    async fn rollback(&self) -> Result<(), TransportError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    /// Whether a local sender is missing from the last completed exchange,
    /// e.g. because an answer had no matching m-line for it.
    async fn has_unnegotiated_senders(&self) -> bool;

    async fn close(&self) -> Result<(), TransportError>;
}

/// Creates transports for a session, one per remote participant.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        remote: ParticipantId,
        role: PeerRole,
        config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>, TransportError>;
}

use classcast_core::{ParticipantId, SignalMessage};
use std::sync::Arc;

use crate::media::{MediaTrack, TrackId};

/// Work delivered to a peer's task. Processed strictly one at a time.
#[derive(Debug)]
pub enum PeerInput {
    /// Offer, answer or ICE candidate from the remote participant.
    Signal(SignalMessage),

    /// Start sending a local track and renegotiate.
    AddTrack(Arc<MediaTrack>),

    /// Stop sending a local track and renegotiate.
    RemoveTrack(TrackId),

    /// Send an offer (initial connect or explicit renegotiation).
    Negotiate,

    /// Tear down without reporting back; the coordinator already knows.
    Close,
}

/// Sent by a peer task to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerNotice {
    /// The connection failed or closed and the peer has cleaned up after
    /// itself. `generation` tells a stale peer apart from its replacement.
    Terminated {
        participant: ParticipantId,
        generation: u64,
    },
}

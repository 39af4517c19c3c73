use classcast_core::ParticipantId;
use thiserror::Error;

use crate::media::TrackId;
use crate::negotiation::NegotiationState;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    WebRtc(#[from] webrtc::Error),

    #[error("no sender attached for track {0}")]
    UnknownSender(TrackId),

    #[error("transport rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    #[error("transport is closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("participant {0} is not connected to the relay")]
    UnknownTarget(ParticipantId),

    #[error("relay connection is closed")]
    Closed,

    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Codec(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("invalid negotiation transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: NegotiationState,
        to: NegotiationState,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error("session has ended")]
    SessionClosed,
}

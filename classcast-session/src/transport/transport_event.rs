use classcast_core::IceCandidate;

use crate::remote::RemoteTrack;

/// Connection state as reported by the underlying transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    /// Failed and Closed end the connection for good.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }
}

/// Events a transport raises for the peer that owns it.
///
/// Each transport serves exactly one remote participant, so events carry no
/// participant id.
#[derive(Debug)]
pub enum TransportEvent {
    /// A local ICE candidate was gathered and must be sent to the remote side.
    CandidateGenerated(IceCandidate),

    StateChanged(ConnectionState),

    /// A remote track started arriving.
    RemoteTrack(RemoteTrack),

    /// The remote track stopped producing media without ending.
    RemoteTrackMuted(String),

    RemoteTrackUnmuted(String),

    RemoteTrackEnded(String),
}

use classcast_core::ParticipantId;
use dashmap::DashMap;
use std::sync::Arc;

use crate::negotiation::NegotiationState;
use crate::transport::ConnectionState;

/// Connection health shown in the presence UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerHealth {
    Connecting,
    Connected,
    Failed,
}

impl PeerHealth {
    /// A `Disconnected` transport may still recover, so it reads as connecting.
    pub fn from_connection(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Connected => PeerHealth::Connected,
            ConnectionState::Failed | ConnectionState::Closed => PeerHealth::Failed,
            ConnectionState::New | ConnectionState::Connecting | ConnectionState::Disconnected => {
                PeerHealth::Connecting
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerStatus {
    pub negotiation: NegotiationState,
    pub health: PeerHealth,
}

/// Per-peer status readable from outside the session task.
#[derive(Clone, Default)]
pub struct PeerStatusBoard {
    entries: Arc<DashMap<ParticipantId, PeerStatus>>,
}

impl PeerStatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, participant: &ParticipantId) -> Option<PeerStatus> {
        self.entries.get(participant).map(|s| *s)
    }

    /// All entries ordered by participant id.
    pub fn snapshot(&self) -> Vec<(ParticipantId, PeerStatus)> {
        let mut all: Vec<_> = self.entries.iter().map(|e| (*e.key(), *e.value())).collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    pub(crate) fn set(&self, participant: ParticipantId, status: PeerStatus) {
        self.entries.insert(participant, status);
    }

    pub(crate) fn remove(&self, participant: &ParticipantId) {
        self.entries.remove(participant);
    }
}

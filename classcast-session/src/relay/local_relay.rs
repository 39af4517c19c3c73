use async_trait::async_trait;
use classcast_core::{IceServerConfig, ParticipantId, SignalMessage};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::relay::{RelayEvent, RelayHandle, SignalingRelay};

struct HubInner {
    members: DashMap<ParticipantId, mpsc::UnboundedSender<RelayEvent>>,
    ice_servers: Vec<IceServerConfig>,
}

/// In-process signaling relay for a single session room.
///
/// Behaves like the WebSocket relay: entrants get the configured ICE
/// servers and a roster, everybody else hears about joins and leaves, and
/// directed messages are stamped with their sender.
#[derive(Clone)]
pub struct LocalRelayHub {
    inner: Arc<HubInner>,
}

impl Default for LocalRelayHub {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl LocalRelayHub {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                members: DashMap::new(),
                ice_servers,
            }),
        }
    }

    /// Enters the room as `participant`. Rejoining with the same id replaces
    /// the previous membership.
    pub fn join(&self, participant: ParticipantId) -> RelayHandle {
        let (tx, rx) = mpsc::unbounded_channel();

        if !self.inner.ice_servers.is_empty() {
            let _ = tx.send(RelayEvent::IceServers(self.inner.ice_servers.clone()));
        }
        let roster = self.members();
        let _ = tx.send(RelayEvent::Welcome {
            roster: roster.iter().copied().filter(|p| *p != participant).collect(),
        });

        self.broadcast(participant, RelayEvent::ParticipantJoined(participant));
        self.inner.members.insert(participant, tx.clone());
        info!("{} joined local relay ({} present)", participant, roster.len() + 1);

        let outbound = LocalRelay {
            hub: self.clone(),
            local_id: participant,
            own_tx: tx,
            closed: AtomicBool::new(false),
        };
        RelayHandle::new(Arc::new(outbound), rx)
    }

    pub fn members(&self) -> Vec<ParticipantId> {
        self.inner.members.iter().map(|e| *e.key()).collect()
    }

    fn leave(&self, participant: ParticipantId, own_tx: &mpsc::UnboundedSender<RelayEvent>) {
        let removed = self
            .inner
            .members
            .remove_if(&participant, |_, tx| tx.same_channel(own_tx));
        if removed.is_none() {
            return;
        }
        info!("{} left local relay", participant);
        self.broadcast(participant, RelayEvent::ParticipantLeft(participant));
    }

    fn broadcast(&self, except: ParticipantId, event: RelayEvent) {
        for member in self.inner.members.iter() {
            if *member.key() != except {
                let _ = member.value().send(event.clone());
            }
        }
    }
}

struct LocalRelay {
    hub: LocalRelayHub,
    local_id: ParticipantId,
    own_tx: mpsc::UnboundedSender<RelayEvent>,
    closed: AtomicBool,
}

#[async_trait]
impl SignalingRelay for LocalRelay {
    async fn send(&self, to: &ParticipantId, message: SignalMessage) -> Result<(), RelayError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RelayError::Closed);
        }
        let Some(target) = self.hub.inner.members.get(to) else {
            warn!("{} signalled absent participant {}", self.local_id, to);
            return Err(RelayError::UnknownTarget(*to));
        };
        debug!("Relaying {} -> {}", self.local_id, to);
        target
            .send(RelayEvent::Signal {
                from: self.local_id,
                message,
            })
            .map_err(|_| RelayError::UnknownTarget(*to))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.hub.leave(self.local_id, &self.own_tx);
        }
    }
}

use async_trait::async_trait;
use classcast_core::{ParticipantId, SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::RelayError;
use crate::relay::RelayEvent;

/// Outbound half of the session's signaling channel.
#[async_trait]
pub trait SignalingRelay: Send + Sync {
    /// Sends a message to exactly one participant of the session.
    async fn send(&self, to: &ParticipantId, message: SignalMessage) -> Result<(), RelayError>;

    /// Leaves the session room. Further sends fail with [`RelayError::Closed`].
    async fn close(&self);
}

/// A session-scoped connection to the relay.
///
/// Built once per session and handed to the coordinator, which owns it until
/// the session ends.
pub struct RelayHandle {
    pub outbound: Arc<dyn SignalingRelay>,
    pub inbound: mpsc::UnboundedReceiver<RelayEvent>,
}

impl RelayHandle {
    pub fn new(
        outbound: Arc<dyn SignalingRelay>,
        inbound: mpsc::UnboundedReceiver<RelayEvent>,
    ) -> Self {
        Self { outbound, inbound }
    }
}

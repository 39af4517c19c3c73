use async_trait::async_trait;
use classcast_core::{ParticipantId, SignalEnvelope, SignalMessage};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::relay::{RelayEvent, RelayHandle, SignalingRelay};

/// WebSocket client for the classcast relay server.
pub struct WsRelay {
    outbox: mpsc::UnboundedSender<Message>,
}

impl WsRelay {
    /// Connects to `ws://host/session/{session}/ws/{participant}`.
    pub async fn connect(url: &str) -> Result<RelayHandle, RelayError> {
        let (ws_stream, _) = connect_async(url).await?;
        info!("Connected to relay at {}", url);

        let (mut write, mut read) = ws_stream.split();
        let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(msg) = outbox_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if write.send(msg).await.is_err() || closing {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Relay connection error: {}", e);
                        break;
                    }
                };
                let envelope = match serde_json::from_str::<SignalEnvelope>(&text) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        warn!("Invalid envelope from relay: {}", e);
                        continue;
                    }
                };
                let Some(event) = RelayEvent::from_envelope(envelope) else {
                    debug!("Dropping unaddressed signal from relay");
                    continue;
                };
                if inbound_tx.send(event).is_err() {
                    break;
                }
            }
            info!("Relay connection closed");
        });

        Ok(RelayHandle::new(Arc::new(WsRelay { outbox }), inbound_rx))
    }
}

#[async_trait]
impl SignalingRelay for WsRelay {
    async fn send(&self, to: &ParticipantId, message: SignalMessage) -> Result<(), RelayError> {
        let json = serde_json::to_string(&SignalEnvelope::directed(*to, message))?;
        self.outbox
            .send(Message::Text(json))
            .map_err(|_| RelayError::Closed)
    }

    async fn close(&self) {
        let _ = self.outbox.send(Message::Close(None));
    }
}

use classcast_core::{IceServerConfig, ParticipantId};
use classcast_relay::{RelayService, serve_on};
use classcast_session::{RelayError, RelayEvent, RelayHandle, WsRelay};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

/// A relay server on an ephemeral local port.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub service: RelayService,
}

impl TestRelay {
    pub async fn start(ice_servers: Vec<IceServerConfig>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test relay");
        let addr = listener.local_addr().expect("No local address");
        let service = RelayService::new(ice_servers);

        tokio::spawn(serve_on(listener, service.clone()));

        Self { addr, service }
    }

    pub fn url(&self, session: &str, participant: &str) -> String {
        format!("ws://{}/session/{}/ws/{}", self.addr, session, participant)
    }

    pub async fn connect(&self, session: &str, participant: ParticipantId) -> RelayHandle {
        self.try_connect(session, &participant.to_string())
            .await
            .expect("Failed to connect to relay")
    }

    pub async fn try_connect(
        &self,
        session: &str,
        participant: &str,
    ) -> Result<RelayHandle, RelayError> {
        WsRelay::connect(&self.url(session, participant)).await
    }
}

/// Next event on the handle, or `None` after `timeout_ms`.
pub async fn next_event(handle: &mut RelayHandle, timeout_ms: u64) -> Option<RelayEvent> {
    tokio::time::timeout(Duration::from_millis(timeout_ms), handle.inbound.recv())
        .await
        .ok()
        .flatten()
}

/// Waits for the first event matching `predicate`, skipping others.
pub async fn expect_event<F>(handle: &mut RelayHandle, predicate: F, timeout_ms: u64) -> RelayEvent
where
    F: Fn(&RelayEvent) -> bool,
{
    let wait = async {
        while let Some(event) = handle.inbound.recv().await {
            if predicate(&event) {
                return Some(event);
            }
        }
        None
    };
    tokio::time::timeout(Duration::from_millis(timeout_ms), wait)
        .await
        .ok()
        .flatten()
        .expect("Expected relay event did not arrive")
}

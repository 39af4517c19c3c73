use classcast_core::{IceServerConfig, ParticipantId};
use classcast_session::{
    NegotiationState, Session, SessionConfig, SyntheticDevices, WebRtcTransportFactory,
};
use std::sync::Arc;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::TestRelay;

#[tokio::test]
async fn test_sessions_negotiate_over_relay() {
    init_tracing();

    // Loopback STUN keeps candidate gathering off the network.
    let relay = TestRelay::start(vec![IceServerConfig::stun("stun:127.0.0.1:3478")]).await;
    let alice = ParticipantId::from_u128(1);
    let bob = ParticipantId::from_u128(2);

    let mut handles = Vec::new();
    for id in [alice, bob] {
        let relay_handle = relay.connect("math-101", id).await;
        let (session, handle) = Session::new(
            id,
            relay_handle,
            Arc::new(SyntheticDevices::new()),
            Arc::new(WebRtcTransportFactory),
            SessionConfig::default(),
        );
        tokio::spawn(session.run());
        handles.push(handle);
    }

    let negotiated = async {
        loop {
            let done = handles.iter().all(|h| {
                let remote = if h.local_id() == alice { bob } else { alice };
                h.peer_status(&remote)
                    .is_some_and(|s| s.negotiation == NegotiationState::Stable)
            });
            if done {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(10), negotiated)
        .await
        .expect("Sessions did not negotiate through the relay");

    for handle in &handles {
        handle.leave().await.expect("Leave failed");
    }
}

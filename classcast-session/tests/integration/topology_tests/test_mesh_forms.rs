use classcast_session::{LocalRelayHub, PeerHealth, SessionEvent};

use crate::integration::init_tracing;
use crate::utils::{TestParticipant, wait_for_event, wait_for_mesh, wait_until};

#[tokio::test]
async fn test_three_participants_form_full_mesh() {
    init_tracing();

    let hub = LocalRelayHub::default();
    let a = TestParticipant::join(&hub, 1).await;
    let b = TestParticipant::join(&hub, 2).await;
    let mut c = TestParticipant::join(&hub, 3).await;

    assert!(wait_for_mesh(&[&a, &b, &c], 5000).await, "Mesh not formed");

    let all = [&a, &b, &c];
    for p in all {
        let mut expected: Vec<_> = all.iter().map(|o| o.id).filter(|id| *id != p.id).collect();
        expected.sort();
        assert_eq!(p.handle.peers().await.expect("Session gone"), expected);
        assert_eq!(p.factory.created().await.len(), 2);

        for other in all.iter().filter(|o| o.id != p.id) {
            let transport = p
                .factory
                .transport_for(&other.id)
                .await
                .expect("No transport");
            // One offer/answer per pair, no collisions on first contact.
            assert_eq!(transport.negotiated().await.len(), 1);
            assert_eq!(transport.rollbacks().await, 0);
        }
    }

    // Every participant receives the camera stream of every other one.
    let streams_ready = wait_until(
        || async {
            all.iter().all(|p| {
                all.iter()
                    .filter(|o| o.id != p.id)
                    .all(|o| p.handle.remote_streams().camera(&o.id).len() == 2)
            })
        },
        5000,
    )
    .await;
    assert!(streams_ready, "Camera streams missing");

    let connected = wait_for_event(
        &mut c.events,
        |e| {
            matches!(
                e,
                SessionEvent::PeerHealthChanged {
                    health: PeerHealth::Connected,
                    ..
                }
            )
        },
        1000,
    )
    .await;
    assert!(connected.is_some());
    assert_eq!(hub.members().len(), 3);
}

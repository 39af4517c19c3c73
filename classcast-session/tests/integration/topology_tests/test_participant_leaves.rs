use classcast_session::{LocalRelayHub, SessionError, SessionEvent, TrackClass};

use crate::integration::init_tracing;
use crate::utils::{TestParticipant, wait_for_event, wait_for_mesh, wait_until};

#[tokio::test]
async fn test_participant_leaves() {
    init_tracing();

    let hub = LocalRelayHub::default();
    let mut a = TestParticipant::join(&hub, 1).await;
    let b = TestParticipant::join(&hub, 2).await;
    assert!(wait_for_mesh(&[&a, &b], 5000).await, "Mesh not formed");

    let to_b = a.factory.transport_for(&b.id).await.expect("No transport");
    let from_a = b.factory.transport_for(&a.id).await.expect("No transport");
    let b_mic = b
        .handle
        .local_media()
        .await
        .expect("Session gone")
        .mic_track
        .expect("No microphone");

    b.handle.leave().await.expect("Leave failed");
    b.task.await.expect("Session task panicked");

    // The leaving side tore everything down.
    assert!(from_a.is_closed().await);
    assert!(!b_mic.is_live());
    assert!(b.handle.peer_statuses().is_empty());
    assert!(matches!(
        b.handle.peers().await,
        Err(SessionError::SessionClosed)
    ));

    // The remaining side hears about it through the relay.
    let gone = wait_until(
        || async { a.handle.peers().await.is_ok_and(|p| p.is_empty()) },
        2000,
    )
    .await;
    assert!(gone, "Peer not removed after leave");
    assert!(to_b.is_closed().await);
    assert!(a.handle.peer_status(&b.id).is_none());
    assert!(a.handle.remote_streams().bucket(&b.id).is_none());

    let removed = wait_for_event(
        &mut a.events,
        |e| {
            matches!(
                e,
                SessionEvent::RemoteTrackRemoved {
                    class: TrackClass::Camera,
                    ..
                }
            )
        },
        1000,
    )
    .await;
    assert!(removed.is_some());
    assert_eq!(hub.members(), vec![a.id]);
}

#[tokio::test]
async fn test_rejoin_after_leave_reconnects() {
    init_tracing();

    let hub = LocalRelayHub::default();
    let a = TestParticipant::join(&hub, 1).await;
    let b = TestParticipant::join(&hub, 2).await;
    assert!(wait_for_mesh(&[&a, &b], 5000).await, "Mesh not formed");

    b.handle.leave().await.expect("Leave failed");
    assert!(
        wait_until(
            || async { a.handle.peers().await.is_ok_and(|p| p.is_empty()) },
            2000,
        )
        .await
    );

    let b_again = TestParticipant::join(&hub, 2).await;
    assert!(wait_for_mesh(&[&a, &b_again], 5000).await, "Rejoin not meshed");
    assert_eq!(a.factory.created().await, vec![b.id, b.id]);

    let old = a.factory.transport_for(&b.id).await.expect("No transport");
    assert!(!old.is_closed().await, "Latest transport must be the new one");
}

use classcast_session::{
    NegotiationState, PeerHealth, PeerStatus, PeerTransport, SessionEvent, TrackSource,
};

use crate::integration::{init_tracing, polite_and_impolite};
use crate::utils::{MockSignalingState, PeerFixture, exchange, local_track};

#[tokio::test]
async fn test_normal_exchange() {
    init_tracing();

    let (alice, bob) = polite_and_impolite();
    let mut a = PeerFixture::new(
        alice,
        bob,
        vec![
            local_track(TrackSource::Microphone, "stream-a"),
            local_track(TrackSource::Camera, "stream-a"),
        ],
    )
    .await;
    let mut b = PeerFixture::new(bob, alice, vec![local_track(TrackSource::Camera, "stream-b")])
        .await;

    assert_eq!(a.peer.negotiation_state(), NegotiationState::Idle);

    b.peer.negotiate().await.expect("Offer failed");
    b.drain_transport().await;
    assert_eq!(b.peer.negotiation_state(), NegotiationState::HaveLocalOffer);

    exchange(&mut a, &mut b).await;

    for side in [&a, &b] {
        assert_eq!(side.peer.negotiation_state(), NegotiationState::Stable);
        assert_eq!(side.peer.health(), PeerHealth::Connected);
        assert_eq!(
            side.status.get(&side.remote),
            Some(PeerStatus {
                negotiation: NegotiationState::Stable,
                health: PeerHealth::Connected,
            })
        );
        assert_eq!(
            side.transport.signaling_state().await,
            MockSignalingState::Stable
        );
        assert_eq!(side.transport.rollbacks().await, 0);
        assert_eq!(side.transport.applied_candidates().await.len(), 2);
        assert!(!side.transport.has_unnegotiated_senders().await);
    }

    // The offer had no audio m-line, so the microphone needed a second
    // exchange started by the answering side.
    let negotiated = a.transport.negotiated().await;
    assert_eq!(negotiated.len(), 2);
    assert_eq!(negotiated, b.transport.negotiated().await);
    assert!(!negotiated[0].0.contains("m=audio"));
    assert!(negotiated[1].0.contains("m=audio"));
    assert_eq!(a.relay.answers_to(&bob).await, 1);
    assert_eq!(b.relay.answers_to(&alice).await, 1);

    // Each side receives the other's camera stream.
    assert_eq!(a.streams.camera(&bob).len(), 1);
    assert_eq!(b.streams.camera(&alice).len(), 2);
    assert!(a.streams.screen(&bob).is_empty());

    let events = a.drain_events();
    assert!(events.contains(&SessionEvent::PeerHealthChanged {
        participant: bob,
        health: PeerHealth::Connected,
    }));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::RemoteTrackAdded { .. }))
            .count(),
        1
    );
}

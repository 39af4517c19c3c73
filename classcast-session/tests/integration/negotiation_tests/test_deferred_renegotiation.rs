use classcast_session::peer::PeerInput;
use classcast_session::{NegotiationState, TrackClass, TrackSource};

use crate::integration::{init_tracing, polite_and_impolite};
use crate::utils::{PeerFixture, exchange, local_track};

#[tokio::test]
async fn test_track_added_mid_exchange_is_offered_afterwards() {
    init_tracing();

    let (alice, bob) = polite_and_impolite();
    let mut a = PeerFixture::new(alice, bob, Vec::new()).await;
    let mut b = PeerFixture::new(bob, alice, vec![local_track(TrackSource::Camera, "stream-b")])
        .await;

    b.peer.negotiate().await.expect("Offer failed");
    b.drain_transport().await;

    let screen = local_track(TrackSource::Screen, "screen-b");
    b.peer.handle(PeerInput::AddTrack(screen.clone())).await;
    b.peer.handle(PeerInput::Negotiate).await;

    // Still waiting on the first answer: nothing new goes out.
    let offers = b.relay.sent().await.iter().filter(|s| s.is_offer()).count();
    assert_eq!(offers, 1);
    assert_eq!(b.peer.negotiation_state(), NegotiationState::HaveLocalOffer);
    assert!(b.peer.local_track_ids().contains(&screen.id()));

    exchange(&mut a, &mut b).await;

    let offers = b.relay.sent().await.iter().filter(|s| s.is_offer()).count();
    assert_eq!(offers, 2);
    assert_eq!(a.relay.answers_to(&bob).await, 2);
    assert_eq!(b.peer.negotiation_state(), NegotiationState::Stable);
    assert_eq!(a.peer.negotiation_state(), NegotiationState::Stable);

    let negotiated = b.transport.negotiated().await;
    assert_eq!(negotiated.len(), 2);
    assert_eq!(negotiated, a.transport.negotiated().await);
    assert!(!negotiated[0].0.contains(&screen.wire_id()));
    assert!(negotiated[1].0.contains(&screen.wire_id()));

    assert_eq!(a.streams.camera(&bob).len(), 1);
    assert_eq!(
        a.streams.class_of(&bob, &screen.wire_id()),
        Some(TrackClass::Screen)
    );
}

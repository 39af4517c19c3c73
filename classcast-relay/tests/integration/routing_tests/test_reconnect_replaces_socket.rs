use classcast_core::{ParticipantId, SessionId, SignalMessage};
use classcast_session::RelayEvent;

use crate::integration::init_tracing;
use crate::utils::{TestRelay, expect_event, next_event};

#[tokio::test]
async fn test_reconnect_replaces_socket() {
    init_tracing();

    let relay = TestRelay::start(Vec::new()).await;
    let alice = ParticipantId::from_u128(1);
    let bob = ParticipantId::from_u128(2);

    let mut a = relay.connect("math-101", alice).await;
    let old_b = relay.connect("math-101", bob).await;
    expect_event(&mut a, |e| *e == RelayEvent::ParticipantJoined(bob), 2000).await;

    let mut new_b = relay.connect("math-101", bob).await;
    expect_event(&mut a, |e| *e == RelayEvent::ParticipantLeft(bob), 2000).await;
    expect_event(&mut a, |e| *e == RelayEvent::ParticipantJoined(bob), 2000).await;
    expect_event(&mut new_b, |e| matches!(e, RelayEvent::Welcome { .. }), 2000).await;

    // The old socket going away must not evict the new one.
    old_b.outbound.close().await;
    assert_eq!(next_event(&mut a, 300).await, None);
    assert_eq!(
        relay.service.participants(&SessionId::from("math-101")),
        vec![alice, bob]
    );

    let offer = SignalMessage::Offer { sdp: "v=0".into() };
    a.outbound.send(&bob, offer.clone()).await.expect("Send failed");
    assert_eq!(
        next_event(&mut new_b, 2000).await,
        Some(RelayEvent::Signal {
            from: alice,
            message: offer,
        })
    );
}

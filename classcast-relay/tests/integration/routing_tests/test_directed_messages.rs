use classcast_core::{IceCandidate, ParticipantId, SignalMessage};
use classcast_session::RelayEvent;

use crate::integration::init_tracing;
use crate::utils::{TestRelay, expect_event, next_event};

#[tokio::test]
async fn test_directed_messages() {
    init_tracing();

    let relay = TestRelay::start(Vec::new()).await;
    let alice = ParticipantId::from_u128(1);
    let bob = ParticipantId::from_u128(2);
    let carol = ParticipantId::from_u128(3);

    let mut a = relay.connect("math-101", alice).await;
    let mut b = relay.connect("math-101", bob).await;
    let mut c = relay.connect("math-101", carol).await;

    expect_event(&mut a, |e| *e == RelayEvent::ParticipantJoined(carol), 2000).await;
    expect_event(&mut b, |e| *e == RelayEvent::ParticipantJoined(carol), 2000).await;
    expect_event(&mut c, |e| matches!(e, RelayEvent::Welcome { .. }), 2000).await;

    let offer = SignalMessage::Offer {
        sdp: "v=0 offer".into(),
    };
    let candidate = SignalMessage::IceCandidate {
        candidate: IceCandidate::new("candidate:1 1 udp 2130706431 10.0.0.1 5000 typ host"),
    };
    c.outbound.send(&alice, offer.clone()).await.expect("Send failed");
    c.outbound
        .send(&alice, candidate.clone())
        .await
        .expect("Send failed");

    assert_eq!(
        next_event(&mut a, 2000).await,
        Some(RelayEvent::Signal {
            from: carol,
            message: offer,
        })
    );
    assert_eq!(
        next_event(&mut a, 2000).await,
        Some(RelayEvent::Signal {
            from: carol,
            message: candidate,
        })
    );

    // Only the target hears it.
    assert_eq!(next_event(&mut b, 300).await, None);

    let answer = SignalMessage::Answer {
        sdp: "v=0 answer".into(),
    };
    a.outbound.send(&carol, answer.clone()).await.expect("Send failed");
    assert_eq!(
        next_event(&mut c, 2000).await,
        Some(RelayEvent::Signal {
            from: alice,
            message: answer,
        })
    );
}

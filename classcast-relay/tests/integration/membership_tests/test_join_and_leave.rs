use classcast_core::{IceServerConfig, ParticipantId, SessionId};
use classcast_session::RelayEvent;

use crate::integration::init_tracing;
use crate::utils::{TestRelay, expect_event, next_event};

#[tokio::test]
async fn test_join_and_leave() {
    init_tracing();

    let turn = IceServerConfig {
        urls: vec!["turn:127.0.0.1:3478".into()],
        username: Some("classroom".into()),
        credential: Some("secret".into()),
    };
    let relay = TestRelay::start(vec![turn.clone()]).await;
    let alice = ParticipantId::from_u128(1);
    let bob = ParticipantId::from_u128(2);

    let mut a = relay.connect("math-101", alice).await;
    assert_eq!(
        next_event(&mut a, 2000).await,
        Some(RelayEvent::IceServers(vec![turn.clone()]))
    );
    assert_eq!(
        next_event(&mut a, 2000).await,
        Some(RelayEvent::Welcome { roster: Vec::new() })
    );

    let mut b = relay.connect("math-101", bob).await;
    assert_eq!(
        next_event(&mut b, 2000).await,
        Some(RelayEvent::IceServers(vec![turn]))
    );
    assert_eq!(
        next_event(&mut b, 2000).await,
        Some(RelayEvent::Welcome {
            roster: vec![alice]
        })
    );
    assert_eq!(
        next_event(&mut a, 2000).await,
        Some(RelayEvent::ParticipantJoined(bob))
    );

    let session = SessionId::from("math-101");
    assert_eq!(relay.service.participants(&session), vec![alice, bob]);

    b.outbound.close().await;
    expect_event(&mut a, |e| *e == RelayEvent::ParticipantLeft(bob), 2000).await;
    assert_eq!(relay.service.participants(&session), vec![alice]);

    a.outbound.close().await;
    let mut closed = false;
    for _ in 0..50 {
        if relay.service.session_count() == 0 {
            closed = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(closed, "Empty session was not dropped");
}

#[tokio::test]
async fn test_invalid_participant_id_is_rejected() {
    init_tracing();

    let relay = TestRelay::start(Vec::new()).await;

    assert!(relay.try_connect("math-101", "not-an-id").await.is_err());
    assert_eq!(relay.service.session_count(), 0);
}

#[tokio::test]
async fn test_numeric_participant_id_is_accepted() {
    init_tracing();

    let relay = TestRelay::start(Vec::new()).await;
    let mut a = relay
        .try_connect("math-101", "7")
        .await
        .expect("Numeric id rejected");

    assert_eq!(
        next_event(&mut a, 2000).await,
        Some(RelayEvent::Welcome { roster: Vec::new() })
    );
    assert_eq!(
        relay.service.participants(&SessionId::from("math-101")),
        vec![ParticipantId::from_u128(7)]
    );
}

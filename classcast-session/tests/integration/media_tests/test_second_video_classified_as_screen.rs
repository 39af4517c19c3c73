use classcast_session::peer::PeerInput;
use classcast_session::{MediaTrack, SessionEvent, TrackClass, TrackSource};
use std::sync::Arc;

use crate::integration::{init_tracing, polite_and_impolite};
use crate::utils::{PeerFixture, exchange, local_track};

#[tokio::test]
async fn test_second_video_classified_as_screen() {
    init_tracing();

    let (alice, bob) = polite_and_impolite();
    let mut a = PeerFixture::new(alice, bob, Vec::new()).await;
    let mut b = PeerFixture::new(
        bob,
        alice,
        vec![
            local_track(TrackSource::Microphone, "stream-b"),
            local_track(TrackSource::Camera, "stream-b"),
        ],
    )
    .await;

    b.peer.negotiate().await.expect("Offer failed");
    b.drain_transport().await;
    exchange(&mut a, &mut b).await;
    assert_eq!(a.streams.camera(&bob).len(), 2);

    // A capture card on its own stream, with nothing screen-like in its name.
    let capture = Arc::new(MediaTrack::new(
        TrackSource::Camera,
        "HD Capture",
        "capture-b",
    ));
    b.peer.handle(PeerInput::AddTrack(capture.clone())).await;
    b.drain_transport().await;
    exchange(&mut a, &mut b).await;

    let wire_id = capture.wire_id();
    assert_eq!(a.streams.class_of(&bob, &wire_id), Some(TrackClass::Screen));
    assert_eq!(a.streams.camera(&bob).len(), 2);
    assert_eq!(a.streams.screen(&bob).len(), 1);

    let added = a.drain_events().into_iter().find(|e| {
        matches!(e, SessionEvent::RemoteTrackAdded { track_id, .. } if *track_id == wire_id)
    });
    assert_eq!(
        added,
        Some(SessionEvent::RemoteTrackAdded {
            participant: bob,
            track_id: wire_id,
            class: TrackClass::Screen,
        })
    );
}

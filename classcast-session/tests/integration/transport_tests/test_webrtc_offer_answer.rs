use classcast_core::SdpKind;
use classcast_session::{
    MediaTrack, PeerRole, PeerTransport, TrackSource, TransportConfig, TransportError,
    WebRtcTransport,
};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::integration::{init_tracing, polite_and_impolite};

/// Transports for both ends of a pair: the first is held by the polite side.
async fn transport_pair() -> (WebRtcTransport, WebRtcTransport) {
    let config = TransportConfig {
        ice_servers: Vec::new(),
    };
    let (polite, impolite) = polite_and_impolite();

    let (a_tx, _a_rx) = mpsc::channel(256);
    let (b_tx, _b_rx) = mpsc::channel(256);
    let a = WebRtcTransport::new(impolite, PeerRole::Polite, &config, a_tx)
        .await
        .expect("Failed to create transport a");
    let b = WebRtcTransport::new(polite, PeerRole::Impolite, &config, b_tx)
        .await
        .expect("Failed to create transport b");
    (a, b)
}

fn track(source: TrackSource, stream_id: &str) -> Arc<MediaTrack> {
    Arc::new(MediaTrack::new(source, "Test Device", stream_id))
}

#[tokio::test]
async fn test_webrtc_offer_answer() {
    init_tracing();

    let (a, b) = transport_pair().await;

    let mic = track(TrackSource::Microphone, "stream-a");
    let cam = track(TrackSource::Camera, "stream-a");
    a.add_track(mic.clone()).await.expect("Adding microphone failed");
    a.add_track(cam.clone()).await.expect("Adding camera failed");
    assert!(a.has_unnegotiated_senders().await);

    // No remote offer yet.
    assert!(b.create_answer().await.is_err());

    let offer = a.create_offer().await.expect("Offer failed");
    assert_eq!(offer.kind, SdpKind::Offer);
    assert!(offer.sdp.contains("m=audio"));
    assert!(offer.sdp.contains("m=video"));
    assert!(offer.sdp.contains(&cam.wire_id()));
    assert!(offer.sdp.contains("stream-a"));

    a.set_local_description(offer.clone())
        .await
        .expect("Setting local offer failed");
    b.set_remote_description(offer)
        .await
        .expect("Setting remote offer failed");

    let answer = b.create_answer().await.expect("Answer failed");
    assert_eq!(answer.kind, SdpKind::Answer);
    b.set_local_description(answer.clone())
        .await
        .expect("Setting local answer failed");
    a.set_remote_description(answer)
        .await
        .expect("Setting remote answer failed");

    assert!(!a.has_unnegotiated_senders().await);
    assert!(!b.has_unnegotiated_senders().await);

    // A sender added after the exchange waits for the next offer.
    let screen = track(TrackSource::Screen, "stream-screen");
    a.add_track(screen).await.expect("Adding screen failed");
    assert!(a.has_unnegotiated_senders().await);

    a.remove_track(cam.id()).await.expect("Removing camera failed");
    assert!(matches!(
        a.remove_track(cam.id()).await,
        Err(TransportError::UnknownSender(id)) if id == cam.id()
    ));

    a.close().await.expect("Closing a failed");
    b.close().await.expect("Closing b failed");
}

#[tokio::test]
async fn test_webrtc_polite_rollback() {
    init_tracing();

    let (a, b) = transport_pair().await;
    a.add_track(track(TrackSource::Camera, "stream-a"))
        .await
        .expect("Adding camera failed");
    b.add_track(track(TrackSource::Camera, "stream-b"))
        .await
        .expect("Adding camera failed");

    // Both sides offer at once.
    let offer_a = a.create_offer().await.expect("Offer a failed");
    a.set_local_description(offer_a)
        .await
        .expect("Setting offer a failed");
    let offer_b = b.create_offer().await.expect("Offer b failed");
    b.set_local_description(offer_b.clone())
        .await
        .expect("Setting offer b failed");

    // The impolite side keeps its offer; the polite side cannot take a
    // remote offer until it drops its own.
    assert!(matches!(
        b.rollback().await,
        Err(TransportError::Rejected { operation: "rollback", .. })
    ));
    assert!(a.set_remote_description(offer_b.clone()).await.is_err());

    a.rollback().await.expect("Polite rollback failed");
    assert!(a.rollback().await.is_err());

    a.set_remote_description(offer_b)
        .await
        .expect("Accepting remote offer failed");
    let answer = a.create_answer().await.expect("Answer failed");
    a.set_local_description(answer.clone())
        .await
        .expect("Setting answer failed");
    b.set_remote_description(answer)
        .await
        .expect("Applying answer failed");

    assert!(!b.has_unnegotiated_senders().await);
    // The answer had no m-line for the dropped offer's camera.
    assert!(a.has_unnegotiated_senders().await);

    a.close().await.expect("Closing a failed");
    b.close().await.expect("Closing b failed");
}


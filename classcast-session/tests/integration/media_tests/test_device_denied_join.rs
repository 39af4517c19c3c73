use classcast_session::{DeviceError, LocalRelayHub, SessionConfig, SessionEvent, SyntheticDevices};
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::{TestParticipant, wait_for_event, wait_for_mesh, wait_until};

#[tokio::test]
async fn test_device_denied_join() {
    init_tracing();

    let hub = LocalRelayHub::default();
    let devices = Arc::new(SyntheticDevices::new());
    devices.set_permission_denied(true);

    let mut a = TestParticipant::join_with(&hub, 1, devices, SessionConfig::default()).await;
    let b = TestParticipant::join(&hub, 2).await;

    let warning = wait_for_event(
        &mut a.events,
        |e| matches!(e, SessionEvent::DeviceWarning(_)),
        2000,
    )
    .await;
    assert_eq!(
        warning,
        Some(SessionEvent::DeviceWarning(DeviceError::PermissionDenied))
    );

    let media = a.handle.local_media().await.expect("Session gone");
    assert!(media.mic_track.is_none() && media.camera_track.is_none());
    assert!(!media.audio_enabled);
    assert!(!media.video_enabled);
    assert!(media.live_tracks().is_empty());

    // Toggles have nothing to act on.
    assert!(!a.handle.toggle_audio().await.expect("Session gone"));
    assert!(!a.handle.toggle_video().await.expect("Session gone"));

    // The session still joins and receives the others' media.
    assert!(wait_for_mesh(&[&a, &b], 5000).await, "Mesh not formed");
    assert!(
        wait_until(
            || async { a.handle.remote_streams().camera(&b.id).len() == 2 },
            5000,
        )
        .await
    );
    assert!(b.handle.remote_streams().bucket(&a.id).is_none_or(|bucket| bucket.is_empty()));
}

#[tokio::test]
async fn test_missing_devices_join() {
    init_tracing();

    let hub = LocalRelayHub::default();
    let devices = Arc::new(SyntheticDevices::new());
    devices.set_no_devices(true);

    let mut a = TestParticipant::join_with(&hub, 1, devices, SessionConfig::default()).await;

    let warning = wait_for_event(
        &mut a.events,
        |e| matches!(e, SessionEvent::DeviceWarning(_)),
        2000,
    )
    .await;
    assert_eq!(warning, Some(SessionEvent::DeviceWarning(DeviceError::NotFound)));
    assert!(a.handle.local_media().await.expect("Session gone").live_tracks().is_empty());
}

#[tokio::test]
async fn test_toggles_keep_tracks_live() {
    init_tracing();

    let hub = LocalRelayHub::default();
    let a = TestParticipant::join(&hub, 1).await;

    assert!(!a.handle.toggle_audio().await.expect("Session gone"));
    assert!(!a.handle.toggle_video().await.expect("Session gone"));

    let media = a.handle.local_media().await.expect("Session gone");
    assert!(!media.audio_enabled && !media.video_enabled);
    let mic = media.mic_track.clone().expect("No microphone");
    assert!(!mic.is_enabled());
    assert!(mic.is_live());
    assert_eq!(media.live_tracks().len(), 2);

    assert!(a.handle.toggle_audio().await.expect("Session gone"));
    assert!(mic.is_enabled());
}

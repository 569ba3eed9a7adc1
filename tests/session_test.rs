use crabcapture::permissions::{PermissionKind, PermissionStatus};
use crabcapture::platform::CaptureOutput;
use crabcapture::testing::{gradient_frame, synthetic_frame, SimulatedLens, SimulatedPlatform};
use crabcapture::{
    CameraSession, CaptureConfig, CaptureError, CaptureMode, LensDirection, PlatformEvent,
    QualityTier, RecordingState, Resolution, Rotation, SelectionField, SessionEvent, UserAction,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Harness {
    platform: Arc<SimulatedPlatform>,
    session: CameraSession,
    tx: mpsc::UnboundedSender<SessionEvent>,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Harness {
    async fn open_with(platform: SimulatedPlatform, config: CaptureConfig) -> Self {
        let platform = Arc::new(platform);
        let (tx, rx) = mpsc::unbounded_channel();
        platform.attach_events(tx.clone());
        let session = CameraSession::open(platform.clone(), config)
            .await
            .expect("session opens");
        Self {
            platform,
            session,
            tx,
            rx,
        }
    }

    async fn open() -> Self {
        Self::open_with(SimulatedPlatform::with_default_lenses(), CaptureConfig::default()).await
    }

    /// Apply host events delivered so far, returning how many were handled.
    async fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            let _ = self.session.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    async fn start_video_recording(&mut self) {
        self.session.set_mode(CaptureMode::Video).unwrap();
        self.session.start_recording().unwrap();
        self.pump().await;
        assert_eq!(self.session.recording().state(), RecordingState::Recording);
    }
}

#[tokio::test]
async fn open_binds_default_photo_pipeline() {
    let h = Harness::open().await;
    let view = h.session.view_state();

    assert_eq!(view.lens, Some(LensDirection::Back));
    assert_eq!(view.mode, CaptureMode::Photo);
    assert_eq!(view.quality_text, "UHD");
    assert_eq!(view.resolution_text, "4032x3024");
    assert_eq!(view.aspect_ratio_text, "4/3");
    assert!(view.bound);
    assert!(view.torch_available);
    assert_eq!(h.platform.stats().active_bindings, 1);
    assert_eq!(h.session.catalog().len(), 2);
}

#[tokio::test]
async fn open_selects_configured_lens_and_mode() {
    let mut config = CaptureConfig::default();
    config.camera.default_lens = LensDirection::Front;
    config.camera.default_mode = CaptureMode::Video;
    let h = Harness::open_with(SimulatedPlatform::with_default_lenses(), config).await;

    assert_eq!(h.session.selection().lens_index(), 1);
    let request = h.platform.bound_request().unwrap();
    assert_eq!(request.lens.direction, LensDirection::Front);
    assert!(matches!(
        request.capture,
        CaptureOutput::Video {
            quality: QualityTier::FHD,
            ..
        }
    ));
}

#[tokio::test]
async fn open_fails_without_camera_permission() {
    let platform = Arc::new(SimulatedPlatform::with_default_lenses());
    platform.set_permission(PermissionKind::Camera, PermissionStatus::Denied);
    let err = CameraSession::open(platform, CaptureConfig::default())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, CaptureError::PermissionDenied(_)));
}

#[tokio::test]
async fn open_fails_without_lenses() {
    let platform = Arc::new(SimulatedPlatform::new(vec![]));
    let err = CameraSession::open(platform, CaptureConfig::default())
        .await
        .err()
        .unwrap();
    assert_eq!(err, CaptureError::NoCameraAvailable);
}

#[tokio::test]
async fn denied_audio_records_silently() {
    let platform = SimulatedPlatform::with_default_lenses();
    platform.set_permission(PermissionKind::Audio, PermissionStatus::Denied);
    let mut h = Harness::open_with(platform, CaptureConfig::default()).await;
    assert!(!h.session.audio_permitted());

    h.start_video_recording().await;
    assert!(!h.session.recording().session().unwrap().audio_enabled);
}

#[tokio::test]
async fn lens_switch_rebinds_once_and_resets_selection() {
    let mut h = Harness::open().await;
    h.session.select(SelectionField::Quality, 2).unwrap();
    let before = h.platform.stats();

    let display = h.session.switch_lens(1).unwrap();
    assert_eq!(display.quality, "FHD");
    assert_eq!(display.resolution, "2592x1944");

    let after = h.platform.stats();
    assert_eq!(after.binds, before.binds + 1);
    assert_eq!(after.unbinds, before.unbinds + 1);
    assert_eq!(after.active_bindings, 1);
    assert_eq!(after.bind_while_bound, 0);
    assert_eq!(h.session.selection().index_of(SelectionField::Quality), 0);
    assert!(!h.session.view_state().torch_available);
}

#[tokio::test]
async fn repeated_selection_does_not_rebind() {
    let mut h = Harness::open().await;
    assert_eq!(h.session.select(SelectionField::AspectRatio, 1).unwrap(), "16/9");
    let binds = h.platform.stats().binds;

    assert_eq!(h.session.select(SelectionField::AspectRatio, 1).unwrap(), "16/9");
    assert_eq!(h.platform.stats().binds, binds);
}

#[tokio::test]
async fn out_of_range_selection_changes_nothing() {
    let mut h = Harness::open().await;
    let view = h.session.view_state();
    let binds = h.platform.stats().binds;

    let err = h.session.select(SelectionField::Quality, 4).unwrap_err();
    assert!(matches!(err, CaptureError::IndexOutOfRange { index: 4, len: 4, .. }));
    assert!(h.session.switch_lens(5).is_err());

    assert_eq!(h.session.view_state(), view);
    assert_eq!(h.platform.stats().binds, binds);
}

#[tokio::test]
async fn rotation_change_rebinds_once() {
    let mut h = Harness::open().await;
    let binds = h.platform.stats().binds;

    h.session.set_rotation(Rotation::Deg90).unwrap();
    h.session.set_rotation(Rotation::Deg90).unwrap();

    assert_eq!(h.platform.stats().binds, binds + 1);
    assert_eq!(h.platform.bound_request().unwrap().rotation, Rotation::Deg90);
}

#[tokio::test]
async fn rotation_during_recording_waits_for_finalize() {
    let mut h = Harness::open().await;
    h.start_video_recording().await;
    let binds = h.platform.stats().binds;

    h.session.set_rotation(Rotation::Deg270).unwrap();
    assert_eq!(h.platform.stats().binds, binds);

    h.session.stop_recording().unwrap();
    h.pump().await;
    assert_eq!(h.session.recording().state(), RecordingState::Finalized);
    assert_eq!(h.platform.stats().binds, binds + 1);
    assert_eq!(h.platform.bound_request().unwrap().rotation, Rotation::Deg270);
}

#[tokio::test]
async fn recording_lifecycle_updates_status_text() {
    let mut h = Harness::open().await;
    let view = h.session.subscribe();
    h.start_video_recording().await;
    assert_eq!(view.borrow().status_text, "Recording: recorded 0KB, in 0second");
    assert!(view.borrow().affordances.stop_visible);

    h.platform
        .emit_recording_progress(2_048_000, Duration::from_millis(2_500));
    h.pump().await;
    assert_eq!(view.borrow().status_text, "Recording: recorded 2048KB, in 2second");

    h.session.pause_recording().unwrap();
    h.pump().await;
    assert_eq!(view.borrow().recording_state, RecordingState::Paused);

    h.session.resume_recording().unwrap();
    h.session.stop_recording().unwrap();
    assert_eq!(view.borrow().recording_state, RecordingState::Finalizing);
    h.pump().await;

    let status = view.borrow().status_text.clone();
    assert!(status.starts_with("Finalized: recorded 2048KB, in 2second\nFile saved to: content://"));
    assert!(view.borrow().affordances.lens_switch_enabled);
}

#[tokio::test]
async fn recording_locks_lens_mode_and_selection() {
    let mut h = Harness::open().await;
    h.start_video_recording().await;

    assert!(matches!(
        h.session.switch_lens(1),
        Err(CaptureError::InvalidTransition { .. })
    ));
    assert!(h.session.set_mode(CaptureMode::Photo).is_err());
    assert!(h.session.select(SelectionField::Quality, 1).is_err());
    assert_eq!(
        h.session.start_recording().unwrap_err(),
        CaptureError::AlreadyRecording
    );
}

#[tokio::test]
async fn recording_requires_video_mode() {
    let mut h = Harness::open().await;
    assert!(matches!(
        h.session.start_recording(),
        Err(CaptureError::InvalidTransition { .. })
    ));
    assert!(h.session.pause_recording().is_err());
    assert_eq!(h.session.recording().state(), RecordingState::Idle);
}

#[tokio::test]
async fn rejected_binding_leaves_session_usable() {
    let platform = SimulatedPlatform::with_default_lenses();
    platform.reject_quality(QualityTier::UHD);
    let mut h = Harness::open_with(platform, CaptureConfig::default()).await;

    let err = h.session.set_mode(CaptureMode::Video).unwrap_err();
    assert!(matches!(err, CaptureError::BindingFailed(_)));
    let view = h.session.view_state();
    assert!(!view.bound);
    assert!(view.last_error.is_some());
    assert!(view.affordances.selectors_enabled);

    h.session.select(SelectionField::Quality, 1).unwrap();
    let view = h.session.view_state();
    assert!(view.bound);
    assert_eq!(view.last_error, None);
    assert_eq!(view.quality_text, "FHD");
}

#[tokio::test]
async fn open_survives_rejected_still_size() {
    let platform = SimulatedPlatform::with_default_lenses();
    platform.reject_resolution(Resolution::new(4032, 3024));
    let mut h = Harness::open_with(platform, CaptureConfig::default()).await;

    let view = h.session.view_state();
    assert!(!view.bound);
    assert!(view.last_error.unwrap().contains("Binding failed"));
    assert!(h.session.take_photo().is_err());

    assert_eq!(
        h.session.select(SelectionField::Resolution, 1).unwrap(),
        "1920x1080"
    );
    assert!(h.session.view_state().bound);
    assert!(h.session.take_photo().is_ok());
}

#[tokio::test]
async fn photo_capture_updates_gallery() {
    let mut h = Harness::open().await;
    let item = h.session.take_photo().unwrap();

    assert!(item.location.starts_with("content://media/external/images/"));
    assert_eq!(item.thumbnail_size, Some((160, 120)));
    assert_eq!(h.session.latest_thumbnail().unwrap().dimensions(), (160, 120));
    assert_eq!(h.session.view_state().latest_media, Some(item));
    assert_eq!(h.platform.stats().photos_taken, 1);

    h.session.set_mode(CaptureMode::Video).unwrap();
    assert!(matches!(
        h.session.take_photo(),
        Err(CaptureError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn torch_and_zoom_follow_lens_capabilities() {
    let mut h = Harness::open().await;

    h.session.set_torch(true).unwrap();
    assert!(h.platform.torch_enabled());
    h.session.set_linear_zoom(0.5).unwrap();
    assert!((h.session.controls().zoom.ratio - 4.5).abs() < 1e-6);
    assert!(h.session.set_zoom_ratio(9.0).is_err());

    h.pump().await;
    assert!(h.session.view_state().torch_enabled);

    h.session.switch_lens(1).unwrap();
    assert!(!h.session.view_state().torch_enabled);
    assert!(matches!(
        h.session.set_torch(true),
        Err(CaptureError::ControlUnsupported(_))
    ));
}

#[tokio::test]
async fn host_torch_notification_wins() {
    let mut h = Harness::open().await;
    h.session
        .handle_event(SessionEvent::Platform(PlatformEvent::TorchChanged(true)))
        .await
        .unwrap();
    assert!(h.session.view_state().torch_enabled);
}

#[tokio::test]
async fn losing_active_lens_resets_to_first_lens() {
    let mut h = Harness::open().await;
    h.session.switch_lens(1).unwrap();

    h.platform.disconnect_lens("1");
    assert_eq!(h.pump().await, 1);

    assert_eq!(h.session.catalog().len(), 1);
    assert_eq!(h.session.selection().lens_index(), 0);
    assert_eq!(h.session.view_state().lens, Some(LensDirection::Back));
    assert!(h.session.view_state().bound);

    h.platform.connect_lens(SimulatedLens::new("2", LensDirection::External, &["HD"]));
    h.pump().await;
    assert_eq!(h.session.catalog().len(), 2);
    assert_eq!(h.session.catalog()[1].direction(), LensDirection::External);
}

#[tokio::test]
async fn frames_feed_luminosity() {
    let mut h = Harness::open().await;
    for i in 0..3u64 {
        h.session
            .handle_event(SessionEvent::Platform(PlatformEvent::Frame(synthetic_frame(
                32,
                24,
                90,
                Duration::from_millis(i * 50),
            ))))
            .await
            .unwrap();
        tokio::task::yield_now().await;
    }

    let mut luminosity = None;
    for _ in 0..50 {
        h.session.poll_analysis();
        luminosity = h.session.view_state().luminosity;
        if luminosity.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(luminosity, Some(90.0));
}

#[tokio::test]
async fn run_applies_user_actions_until_close() {
    let mut h = Harness::open().await;
    let view = h.session.subscribe();

    h.tx.send(UserAction::SwitchLens(1).into()).unwrap();
    h.tx.send(
        UserAction::Select {
            field: SelectionField::Quality,
            index: 9,
        }
        .into(),
    )
    .unwrap();
    h.tx.send(UserAction::TakePhoto.into()).unwrap();
    h.tx.send(UserAction::Close.into()).unwrap();

    let rx = std::mem::replace(&mut h.rx, mpsc::unbounded_channel().1);
    h.session.run(rx).await.unwrap();

    let state = view.borrow().clone();
    assert!(state.closed);
    assert_eq!(state.lens, Some(LensDirection::Front));
    assert!(state.latest_media.is_some());
    assert!(!state.bound);
    assert_eq!(h.platform.stats().active_bindings, 0);
    assert!(h.session.take_photo().is_err());
}

#[tokio::test]
async fn run_ends_on_fatal_catalog_loss() {
    let mut h = Harness::open().await;
    h.tx.send(PlatformEvent::LensAvailabilityChanged(vec![]).into())
        .unwrap();

    let rx = std::mem::replace(&mut h.rx, mpsc::unbounded_channel().1);
    let err = h.session.run(rx).await.unwrap_err();
    assert_eq!(err, CaptureError::NoCameraAvailable);
    assert!(h.session.is_closed());
}

#[tokio::test]
async fn close_stops_recording_and_releases_pipeline() {
    let mut h = Harness::open().await;
    h.start_video_recording().await;

    h.session.close();
    assert!(h.session.is_closed());
    assert_eq!(h.platform.stats().active_bindings, 0);
    assert!(h.session.subscribe().borrow().closed);

    // The host still reports the finalized file after close.
    assert_eq!(h.pump().await, 1);
    assert!(h.session.set_rotation(Rotation::Deg90).is_err());
}

#[tokio::test]
async fn close_drops_deferred_rebind() {
    let mut h = Harness::open().await;
    h.start_video_recording().await;
    h.session.set_rotation(Rotation::Deg90).unwrap();

    h.session.close();
    assert_eq!(h.platform.stats().active_bindings, 0);

    // The host finalizes the stopped recording after the session closed.
    assert_eq!(h.pump().await, 1);
    assert_eq!(h.session.recording().state(), RecordingState::Finalized);
    assert_eq!(h.platform.stats().active_bindings, 0);
    assert!(!h.session.view_state().bound);
    assert!(h.session.is_closed());
}

#[tokio::test]
async fn lens_change_while_starting_unlocks_selection() {
    let mut h = Harness::open().await;
    h.session.set_mode(CaptureMode::Video).unwrap();
    h.session.start_recording().unwrap();
    assert_eq!(h.session.recording().state(), RecordingState::Starting);

    // Availability change arrives before the host confirms the start.
    h.session
        .handle_event(
            PlatformEvent::LensAvailabilityChanged(vec![LensDirection::Back, LensDirection::Front])
                .into(),
        )
        .await
        .unwrap();
    assert_eq!(h.session.recording().state(), RecordingState::Idle);
    assert!(h.session.view_state().affordances.lens_switch_enabled);

    h.session.switch_lens(1).unwrap();
    h.pump().await;
    assert_eq!(h.session.recording().state(), RecordingState::Idle);
    assert_eq!(h.session.view_state().lens, Some(LensDirection::Front));
}

#[tokio::test]
async fn device_orientation_snaps_to_rotation() {
    let mut h = Harness::open().await;
    let binds = h.platform.stats().binds;

    h.session
        .handle_user_action(UserAction::SetOrientation(100))
        .unwrap();
    assert_eq!(h.session.rotation(), Rotation::Deg90);
    h.session.set_device_orientation(80).unwrap();

    assert_eq!(h.platform.stats().binds, binds + 1);
    assert_eq!(h.platform.bound_request().unwrap().rotation, Rotation::Deg90);
}

#[tokio::test]
async fn view_reports_linear_zoom() {
    let mut h = Harness::open().await;
    assert_eq!(h.session.view_state().zoom_linear, 0.0);

    h.session.set_zoom_ratio(4.5).unwrap();
    assert!((h.session.view_state().zoom_linear - 0.5).abs() < 1e-6);
}

#[tokio::test]
async fn host_frames_reach_analysis() {
    let mut h = Harness::open().await;
    for n in 0..3 {
        assert!(h
            .platform
            .emit(PlatformEvent::Frame(gradient_frame(n, 16, 8, 30))));
    }
    assert_eq!(h.pump().await, 3);

    let mut fps = None;
    for _ in 0..50 {
        tokio::task::yield_now().await;
        h.session.poll_analysis();
        fps = h.session.view_state().fps;
        if fps.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let fps = fps.expect("frame rate reported");
    assert!((fps - 30.0).abs() < 1e-6, "fps was {}", fps);
}

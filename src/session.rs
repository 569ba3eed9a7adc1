//! Camera session: the single owner of all capture state.
//!
//! A [`CameraSession`] is created when the camera screen opens and dropped
//! when it closes. One task owns it and applies every mutation, either by
//! calling its methods directly or by feeding [`SessionEvent`]s to
//! [`CameraSession::run`]. The view layer observes [`ViewState`] through a
//! `watch` channel.

use crate::analysis::{AnalysisWorker, LumaReport};
use crate::binder::PipelineBinder;
use crate::catalog;
use crate::config::CaptureConfig;
use crate::controls::CameraControls;
use crate::errors::{CaptureError, SelectionField};
use crate::permissions::{self, PermissionKind};
use crate::photo::{gallery_thumbnail, GalleryItem, MediaDestination};
use crate::platform::{CameraPlatform, PlatformEvent, RecordingRequest};
use crate::recording::{Affordances, RecordingEvent, RecordingState, RecordingStateMachine};
use crate::selection::{DisplayStrings, SelectionState};
use crate::types::{CaptureMode, LensCapability, LensDirection, Rotation};
use chrono::Utc;
use image::RgbImage;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Requests coming from the view layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    SwitchLens(usize),
    Select { field: SelectionField, index: usize },
    SetMode(CaptureMode),
    SetRotation(Rotation),
    /// Raw device orientation in degrees, snapped to the nearest quarter turn.
    SetOrientation(i32),
    StartRecording,
    PauseRecording,
    ResumeRecording,
    StopRecording,
    TakePhoto,
    SetTorch(bool),
    SetZoomRatio(f32),
    SetLinearZoom(f32),
    Close,
}

/// Everything the session task consumes, in arrival order.
#[derive(Debug)]
pub enum SessionEvent {
    Platform(PlatformEvent),
    User(UserAction),
}

impl From<PlatformEvent> for SessionEvent {
    fn from(event: PlatformEvent) -> Self {
        SessionEvent::Platform(event)
    }
}

impl From<UserAction> for SessionEvent {
    fn from(action: UserAction) -> Self {
        SessionEvent::User(action)
    }
}

/// What the view layer renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub lens: Option<LensDirection>,
    pub mode: CaptureMode,
    pub quality_text: String,
    pub resolution_text: String,
    pub aspect_ratio_text: String,
    pub status_text: String,
    pub recording_state: RecordingState,
    pub affordances: Affordances,
    pub bound: bool,
    pub torch_available: bool,
    pub torch_enabled: bool,
    pub zoom_ratio: f32,
    pub zoom_linear: f32,
    pub luminosity: Option<f64>,
    pub fps: Option<f64>,
    pub latest_media: Option<GalleryItem>,
    pub last_error: Option<String>,
    pub closed: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            lens: None,
            mode: CaptureMode::default(),
            quality_text: String::new(),
            resolution_text: String::new(),
            aspect_ratio_text: String::new(),
            status_text: String::new(),
            recording_state: RecordingState::Idle,
            affordances: Affordances::for_state(RecordingState::Idle),
            bound: false,
            torch_available: false,
            torch_enabled: false,
            zoom_ratio: 1.0,
            zoom_linear: 0.0,
            luminosity: None,
            fps: None,
            latest_media: None,
            last_error: None,
            closed: false,
        }
    }
}

pub struct CameraSession {
    platform: Arc<dyn CameraPlatform>,
    config: CaptureConfig,
    catalog: Vec<LensCapability>,
    selection: SelectionState,
    binder: PipelineBinder,
    recording: RecordingStateMachine,
    controls: CameraControls,
    mode: CaptureMode,
    rotation: Rotation,
    audio_permitted: bool,
    pending_rebind: bool,
    latest_media: Option<GalleryItem>,
    latest_thumbnail: Option<RgbImage>,
    luminosity: Option<LumaReport>,
    last_error: Option<String>,
    analysis: Option<AnalysisWorker>,
    reports: Option<mpsc::UnboundedReceiver<LumaReport>>,
    view: watch::Sender<ViewState>,
    closed: bool,
}

impl CameraSession {
    /// Open the camera: check permission, build the catalog, select the
    /// configured default lens and bind the configured mode.
    ///
    /// A binding failure does not fail the open; the session stays unbound
    /// and the error is visible in [`ViewState::last_error`].
    pub async fn open(
        platform: Arc<dyn CameraPlatform>,
        config: CaptureConfig,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::Config)?;
        permissions::ensure_granted(
            PermissionKind::Camera,
            platform.permission_status(PermissionKind::Camera),
        )?;

        let audio_permitted = config.recording.audio_enabled
            && platform.permission_status(PermissionKind::Audio).is_granted();
        if config.recording.audio_enabled && !audio_permitted {
            log::warn!("Audio permission not granted, recordings will be silent");
        }

        let catalog = Self::load_catalog(platform.clone(), LensDirection::ALL.to_vec()).await?;
        let mut selection = SelectionState::new(&catalog)?;
        if let Some(index) = catalog
            .iter()
            .position(|c| c.direction() == config.camera.default_lens)
        {
            selection.select_lens(&catalog, index)?;
        }

        let (analysis, reports) = if config.analysis.enabled {
            let (tx, rx) = mpsc::unbounded_channel();
            let worker = AnalysisWorker::spawn(
                config.analysis.fps_window,
                config.analysis.queue_capacity,
                tx,
            );
            (Some(worker), Some(rx))
        } else {
            (None, None)
        };

        let (view, _) = watch::channel(ViewState::default());
        let mut session = Self {
            binder: PipelineBinder::new(platform.clone()),
            controls: CameraControls::for_lens(selection.entry()),
            mode: config.camera.default_mode,
            platform,
            config,
            catalog,
            selection,
            recording: RecordingStateMachine::new(),
            rotation: Rotation::default(),
            audio_permitted,
            pending_rebind: false,
            latest_media: None,
            latest_thumbnail: None,
            luminosity: None,
            last_error: None,
            analysis,
            reports,
            view,
            closed: false,
        };

        log::info!(
            "Camera session opened on {} lens in {} mode",
            session.selection.entry().direction(),
            session.mode
        );
        if let Err(e) = session.rebind() {
            log::warn!("Session opened unbound: {}", e);
        }
        Ok(session)
    }

    /// Capability queries block on the hardware; keep them off the session task.
    async fn load_catalog(
        platform: Arc<dyn CameraPlatform>,
        directions: Vec<LensDirection>,
    ) -> Result<Vec<LensCapability>, CaptureError> {
        tokio::task::spawn_blocking(move || catalog::refresh(platform.as_ref(), &directions))
            .await
            .map_err(|e| CaptureError::Platform(format!("capability query worker failed: {}", e)))?
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view.subscribe()
    }

    /// Consume events until the channel closes or the session is closed.
    /// Returns the fatal error that ended the session, if any.
    pub async fn run(
        &mut self,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Result<(), CaptureError> {
        while !self.closed {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    if let Err(e) = self.handle_event(event).await {
                        if e.is_fatal() {
                            log::error!("Session ended: {}", e);
                            self.close();
                            return Err(e);
                        }
                        log::warn!("Session event failed: {}", e);
                    }
                }
                Some(report) = next_report(&mut self.reports) => self.on_luma_report(report),
            }
        }
        Ok(())
    }

    pub async fn handle_event(&mut self, event: SessionEvent) -> Result<(), CaptureError> {
        match event {
            SessionEvent::Platform(event) => self.handle_platform_event(event).await,
            SessionEvent::User(action) => self.handle_user_action(action),
        }
    }

    pub async fn handle_platform_event(&mut self, event: PlatformEvent) -> Result<(), CaptureError> {
        match event {
            PlatformEvent::LensAvailabilityChanged(directions) => {
                self.rebuild_catalog(directions).await
            }
            PlatformEvent::Recording(event) => self.on_recording_event(event),
            PlatformEvent::TorchChanged(enabled) => {
                self.controls.on_torch_changed(enabled);
                self.publish();
                Ok(())
            }
            PlatformEvent::ZoomChanged { ratio } => {
                self.controls.on_zoom_changed(ratio);
                self.publish();
                Ok(())
            }
            PlatformEvent::Frame(frame) => {
                if let Some(worker) = &self.analysis {
                    worker.submit(frame);
                }
                Ok(())
            }
        }
    }

    pub fn handle_user_action(&mut self, action: UserAction) -> Result<(), CaptureError> {
        match action {
            UserAction::SwitchLens(index) => self.switch_lens(index).map(|_| ()),
            UserAction::Select { field, index } => self.select(field, index).map(|_| ()),
            UserAction::SetMode(mode) => self.set_mode(mode),
            UserAction::SetRotation(rotation) => self.set_rotation(rotation),
            UserAction::SetOrientation(degrees) => self.set_device_orientation(degrees),
            UserAction::StartRecording => self.start_recording(),
            UserAction::PauseRecording => self.pause_recording(),
            UserAction::ResumeRecording => self.resume_recording(),
            UserAction::StopRecording => self.stop_recording(),
            UserAction::TakePhoto => self.take_photo().map(|_| ()),
            UserAction::SetTorch(enabled) => self.set_torch(enabled),
            UserAction::SetZoomRatio(ratio) => self.set_zoom_ratio(ratio),
            UserAction::SetLinearZoom(linear) => self.set_linear_zoom(linear),
            UserAction::Close => {
                self.close();
                Ok(())
            }
        }
    }

    pub fn switch_lens(&mut self, index: usize) -> Result<DisplayStrings, CaptureError> {
        self.ensure_idle("switch lens")?;
        let display = self.selection.select_lens(&self.catalog, index)?.clone();
        log::info!("Switched to {} lens", self.selection.entry().direction());
        self.rebind()?;
        Ok(display)
    }

    pub fn select(&mut self, field: SelectionField, index: usize) -> Result<String, CaptureError> {
        if field == SelectionField::Lens {
            return self
                .switch_lens(index)
                .map(|_| self.selection.display_for(SelectionField::Lens).to_string());
        }
        self.ensure_idle("change selection")?;

        let previous = self.selection.index_of(field);
        let display = self.selection.select(field, index)?;
        if previous != index {
            self.rebind()?;
        }
        Ok(display)
    }

    pub fn set_mode(&mut self, mode: CaptureMode) -> Result<(), CaptureError> {
        self.ensure_idle("change mode")?;
        if self.mode == mode && self.binder.is_bound() {
            return Ok(());
        }
        self.mode = mode;
        self.rebind()
    }

    /// Apply a device orientation change. While recording, the rebind is
    /// deferred until the recording finalizes.
    pub fn set_rotation(&mut self, rotation: Rotation) -> Result<(), CaptureError> {
        self.ensure_open("rotate")?;
        if self.rotation == rotation {
            return Ok(());
        }
        self.rotation = rotation;
        if self.recording.state().is_active() {
            log::info!("Rotation to {} deferred until recording ends", rotation.degrees());
            self.pending_rebind = true;
            self.publish();
            return Ok(());
        }
        self.rebind()
    }

    pub fn set_device_orientation(&mut self, degrees: i32) -> Result<(), CaptureError> {
        self.set_rotation(Rotation::from_degrees(degrees))
    }

    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        self.ensure_open("start recording")?;
        if self.mode != CaptureMode::Video {
            return Err(CaptureError::invalid_transition("in photo mode", "start recording"));
        }
        if !self.binder.is_bound() {
            return Err(CaptureError::BindingFailed("pipeline is not bound".to_string()));
        }

        let destination = MediaDestination::video(&self.config.recording);
        let request = RecordingRequest {
            destination: destination.clone(),
            audio_enabled: self.audio_permitted,
        };
        self.recording.start(destination, self.audio_permitted)?;

        if let Err(e) = self.platform.start_recording(&request) {
            log::error!("Host refused to start recording: {}", e);
            self.recording.abort(&e.to_string());
            self.last_error = Some(e.to_string());
            self.publish();
            return Err(e.into());
        }
        self.publish();
        Ok(())
    }

    pub fn pause_recording(&mut self) -> Result<(), CaptureError> {
        self.recording_command(RecordingStateMachine::pause, |p| p.pause_recording())
    }

    pub fn resume_recording(&mut self) -> Result<(), CaptureError> {
        self.recording_command(RecordingStateMachine::resume, |p| p.resume_recording())
    }

    pub fn stop_recording(&mut self) -> Result<(), CaptureError> {
        self.recording_command(RecordingStateMachine::stop, |p| p.stop_recording())
    }

    /// Transition locally, then ask the host; roll back if the host refuses.
    fn recording_command(
        &mut self,
        transition: fn(&mut RecordingStateMachine) -> Result<String, CaptureError>,
        command: impl FnOnce(&dyn CameraPlatform) -> Result<(), crate::errors::PlatformError>,
    ) -> Result<(), CaptureError> {
        self.ensure_open("control recording")?;
        let snapshot = self.recording.clone();
        transition(&mut self.recording)?;

        if let Err(e) = command(self.platform.as_ref()) {
            log::error!("Recording command failed: {}", e);
            self.recording = snapshot;
            self.last_error = Some(e.to_string());
            self.publish();
            return Err(e.into());
        }
        self.publish();
        Ok(())
    }

    pub fn take_photo(&mut self) -> Result<GalleryItem, CaptureError> {
        self.ensure_open("take photo")?;
        match self.binder.current().map(|b| b.mode) {
            Some(CaptureMode::Photo) => {}
            Some(CaptureMode::Video) => {
                return Err(CaptureError::invalid_transition("in video mode", "take photo"))
            }
            None => return Err(CaptureError::BindingFailed("pipeline is not bound".to_string())),
        }

        let destination = MediaDestination::photo(&self.config.photo);
        let saved = self.platform.take_picture(&destination).map_err(|e| {
            log::error!("Photo capture failed: {}", e);
            CaptureError::from(e)
        })?;

        let thumbnail = saved
            .preview
            .as_ref()
            .map(|preview| gallery_thumbnail(preview, self.config.photo.thumbnail_max_edge));
        let item = GalleryItem {
            location: saved.location,
            display_name: destination.display_name,
            captured_at: Utc::now(),
            thumbnail_size: thumbnail.as_ref().map(|t| t.dimensions()),
        };
        log::info!("Photo saved: {}", item.location);

        self.latest_thumbnail = thumbnail;
        self.latest_media = Some(item.clone());
        self.publish();
        Ok(item)
    }

    pub fn set_torch(&mut self, enabled: bool) -> Result<(), CaptureError> {
        self.ensure_bound("toggle torch")?;
        self.controls.check_torch(enabled)?;
        self.platform.enable_torch(enabled)?;
        self.controls.on_torch_changed(enabled);
        self.publish();
        Ok(())
    }

    pub fn set_zoom_ratio(&mut self, ratio: f32) -> Result<(), CaptureError> {
        self.ensure_bound("zoom")?;
        let ratio = self.controls.check_zoom_ratio(ratio)?;
        self.platform.set_zoom_ratio(ratio)?;
        self.controls.on_zoom_changed(ratio);
        self.publish();
        Ok(())
    }

    pub fn set_linear_zoom(&mut self, linear: f32) -> Result<(), CaptureError> {
        let ratio = self.controls.linear_to_ratio(linear)?;
        self.set_zoom_ratio(ratio)
    }

    /// End the session: stop any recording and release the hardware.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if self.recording.state().is_active() {
            if let Err(e) = self.platform.stop_recording() {
                log::warn!("Error stopping recording during close: {}", e);
            }
        }
        self.pending_rebind = false;
        self.binder.unbind();
        self.analysis = None;
        self.reports = None;
        self.closed = true;
        log::info!("Camera session closed");
        self.publish();
    }

    /// Apply analysis results that arrived outside [`CameraSession::run`].
    pub fn poll_analysis(&mut self) -> usize {
        let mut reports = Vec::new();
        if let Some(rx) = self.reports.as_mut() {
            while let Ok(report) = rx.try_recv() {
                reports.push(report);
            }
        }
        let count = reports.len();
        for report in reports {
            self.on_luma_report(report);
        }
        count
    }

    pub fn catalog(&self) -> &[LensCapability] {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn binder(&self) -> &PipelineBinder {
        &self.binder
    }

    pub fn recording(&self) -> &RecordingStateMachine {
        &self.recording
    }

    pub fn controls(&self) -> &CameraControls {
        &self.controls
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn audio_permitted(&self) -> bool {
        self.audio_permitted
    }

    pub fn latest_media(&self) -> Option<&GalleryItem> {
        self.latest_media.as_ref()
    }

    pub fn latest_thumbnail(&self) -> Option<&RgbImage> {
        self.latest_thumbnail.as_ref()
    }

    pub fn dropped_frames(&self) -> u64 {
        self.analysis.as_ref().map_or(0, |w| w.dropped_frames())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn view_state(&self) -> ViewState {
        let display = self.selection.display();
        ViewState {
            lens: (!self.catalog.is_empty()).then(|| self.selection.entry().direction()),
            mode: self.mode,
            quality_text: display.quality.clone(),
            resolution_text: display.resolution.clone(),
            aspect_ratio_text: display.aspect_ratio.clone(),
            status_text: self.recording.status_text(),
            recording_state: self.recording.state(),
            affordances: self.recording.affordances(),
            bound: self.binder.is_bound(),
            torch_available: self.controls.torch.available,
            torch_enabled: self.controls.torch.enabled,
            zoom_ratio: self.controls.zoom.ratio,
            zoom_linear: self.controls.zoom.linear(),
            luminosity: self.luminosity.map(|r| r.luminosity),
            fps: self.luminosity.and_then(|r| r.fps),
            latest_media: self.latest_media.clone(),
            last_error: self.last_error.clone(),
            closed: self.closed,
        }
    }

    fn on_recording_event(&mut self, event: RecordingEvent) -> Result<(), CaptureError> {
        let result = self.recording.on_event(event);
        if let Ok(status) = &result {
            log::debug!("{}", status);
        }
        if self.recording.state() == RecordingState::Finalized && self.pending_rebind {
            if let Err(e) = self.rebind() {
                log::warn!("Deferred rebind failed: {}", e);
            }
        }
        self.publish();
        result.map(|_| ())
    }

    async fn rebuild_catalog(&mut self, directions: Vec<LensDirection>) -> Result<(), CaptureError> {
        self.ensure_open("rebuild catalog")?;
        log::info!("Lens availability changed: {:?}", directions);

        let state = self.recording.state();
        if state.is_active() {
            log::warn!("Lens set changed while {}, stopping recording", state);
            if let Err(e) = self.platform.stop_recording() {
                log::warn!("Error stopping recording: {}", e);
            }
            match state {
                RecordingState::Starting => self.recording.abort("lens set changed"),
                RecordingState::Finalizing => {}
                _ => {
                    if let Err(e) = self.recording.stop() {
                        log::error!("Cannot stop recording for catalog rebuild: {}", e);
                    }
                }
            }
        }
        self.binder.unbind();

        let catalog = match Self::load_catalog(self.platform.clone(), directions).await {
            Ok(catalog) => catalog,
            Err(e) => {
                self.catalog.clear();
                self.last_error = Some(e.to_string());
                self.publish();
                return Err(e);
            }
        };

        self.selection = SelectionState::new(&catalog)?;
        self.catalog = catalog;
        self.rebind()
    }

    fn rebind(&mut self) -> Result<(), CaptureError> {
        self.ensure_open("bind")?;
        self.pending_rebind = false;
        let result = self
            .binder
            .bind(self.selection.entry(), &self.selection, self.mode, self.rotation)
            .map(|_| ());

        match &result {
            Ok(()) => {
                self.controls = CameraControls::for_lens(self.selection.entry());
                self.last_error = None;
            }
            Err(e) => {
                self.controls = CameraControls::default();
                self.last_error = Some(e.to_string());
            }
        }
        self.publish();
        result
    }

    fn on_luma_report(&mut self, report: LumaReport) {
        log::trace!("Luminosity {:.1} fps {:?}", report.luminosity, report.fps);
        self.luminosity = Some(report);
        self.publish();
    }

    fn publish(&self) {
        self.view.send_replace(self.view_state());
    }

    fn ensure_open(&self, action: &str) -> Result<(), CaptureError> {
        if self.closed {
            return Err(CaptureError::invalid_transition("closed", action));
        }
        Ok(())
    }

    /// Lens, mode and selection are locked while a recording holds the pipeline.
    fn ensure_idle(&self, action: &str) -> Result<(), CaptureError> {
        self.ensure_open(action)?;
        let state = self.recording.state();
        if state.is_active() {
            return Err(CaptureError::invalid_transition(state, action));
        }
        Ok(())
    }

    fn ensure_bound(&self, action: &str) -> Result<(), CaptureError> {
        self.ensure_open(action)?;
        if !self.binder.is_bound() {
            return Err(CaptureError::BindingFailed(format!(
                "cannot {} without a bound pipeline",
                action
            )));
        }
        Ok(())
    }
}

async fn next_report(reports: &mut Option<mpsc::UnboundedReceiver<LumaReport>>) -> Option<LumaReport> {
    match reports {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

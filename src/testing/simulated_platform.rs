//! In-memory host camera subsystem.
//!
//! Behaves like a strict platform: a lens can only be opened by one caller at
//! a time, binding while something is already bound is refused, and recording
//! commands answer with events on the attached session channel.

use crate::errors::PlatformError;
use crate::permissions::{PermissionKind, PermissionStatus};
use crate::photo::MediaDestination;
use crate::platform::{
    BindingId, CameraPlatform, CaptureOutput, LensInfo, LensMonitor, PipelineRequest,
    PlatformEvent, RecordingRequest, SavedMedia,
};
use crate::recording::{RecordingEvent, RecordingStats};
use crate::session::SessionEvent;
use crate::types::{LensDirection, LensSelector, QualityTier, Resolution, ZoomRange};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone)]
pub struct SimulatedLens {
    pub selector: LensSelector,
    pub quality_names: Vec<String>,
    pub still_resolutions: Vec<Resolution>,
    pub has_flash_unit: bool,
    pub zoom_range: ZoomRange,
    pub fail_probe: bool,
}

impl SimulatedLens {
    pub fn new(id: &str, direction: LensDirection, qualities: &[&str]) -> Self {
        Self {
            selector: LensSelector::new(id, direction),
            quality_names: qualities.iter().map(|q| q.to_string()).collect(),
            still_resolutions: vec![Resolution::new(1920, 1080), Resolution::new(640, 480)],
            has_flash_unit: false,
            zoom_range: ZoomRange::default(),
            fail_probe: false,
        }
    }

    pub fn with_resolutions(mut self, resolutions: Vec<Resolution>) -> Self {
        self.still_resolutions = resolutions;
        self
    }

    pub fn with_flash_unit(mut self) -> Self {
        self.has_flash_unit = true;
        self
    }

    pub fn with_zoom(mut self, min_ratio: f32, max_ratio: f32) -> Self {
        self.zoom_range = ZoomRange {
            min_ratio,
            max_ratio,
        };
        self
    }

    /// Capability reads on this lens fail, as with a lens held by another app.
    pub fn failing_probe(mut self) -> Self {
        self.fail_probe = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformStats {
    pub activations: u64,
    pub releases: u64,
    pub concurrent_activation_errors: u64,
    pub binds: u64,
    pub unbinds: u64,
    /// Bind requests issued while a binding was still held.
    pub bind_while_bound: u64,
    pub rejected_binds: u64,
    pub active_bindings: u64,
    pub recordings_started: u64,
    pub photos_taken: u64,
}

#[derive(Debug)]
struct ActiveRecording {
    destination: MediaDestination,
    stats: RecordingStats,
}

struct SimState {
    lenses: Vec<SimulatedLens>,
    monitor: LensMonitor,
    opened_lens: Option<String>,
    binding: Option<(BindingId, PipelineRequest)>,
    next_binding: u64,
    rejected_qualities: Vec<QualityTier>,
    rejected_resolutions: Vec<Resolution>,
    recording: Option<ActiveRecording>,
    camera_permission: PermissionStatus,
    audio_permission: PermissionStatus,
    torch: bool,
    zoom_ratio: f32,
    media_counter: u64,
    stats: PlatformStats,
    events: Option<UnboundedSender<SessionEvent>>,
}

pub struct SimulatedPlatform {
    state: Mutex<SimState>,
}

impl SimulatedPlatform {
    pub fn new(lenses: Vec<SimulatedLens>) -> Self {
        let mut monitor = LensMonitor::new();
        monitor.update(lenses.iter().map(|l| l.selector.clone()).collect());
        Self {
            state: Mutex::new(SimState {
                lenses,
                monitor,
                opened_lens: None,
                binding: None,
                next_binding: 1,
                rejected_qualities: Vec::new(),
                rejected_resolutions: Vec::new(),
                recording: None,
                camera_permission: PermissionStatus::Granted,
                audio_permission: PermissionStatus::Granted,
                torch: false,
                zoom_ratio: 1.0,
                media_counter: 0,
                stats: PlatformStats::default(),
                events: None,
            }),
        }
    }

    /// A phone-like device: a back lens with all four tiers, flash and 8x
    /// zoom, and a front lens with FHD and HD.
    pub fn with_default_lenses() -> Self {
        Self::new(vec![
            SimulatedLens::new("0", LensDirection::Back, &["UHD", "FHD", "HD", "SD"])
                .with_resolutions(vec![
                    Resolution::new(4032, 3024),
                    Resolution::new(1920, 1080),
                    Resolution::new(1280, 720),
                    Resolution::new(640, 480),
                ])
                .with_flash_unit()
                .with_zoom(1.0, 8.0),
            SimulatedLens::new("1", LensDirection::Front, &["FHD", "HD"]).with_resolutions(vec![
                Resolution::new(2592, 1944),
                Resolution::new(1280, 720),
            ]),
        ])
    }

    /// Deliver host notifications to a session's event channel.
    pub fn attach_events(&self, sender: UnboundedSender<SessionEvent>) {
        self.state().events = Some(sender);
    }

    pub fn set_permission(&self, kind: PermissionKind, status: PermissionStatus) {
        let mut state = self.state();
        match kind {
            PermissionKind::Camera => state.camera_permission = status,
            PermissionKind::Audio => state.audio_permission = status,
        }
    }

    /// Refuse video bindings at this quality tier.
    pub fn reject_quality(&self, quality: QualityTier) {
        self.state().rejected_qualities.push(quality);
    }

    /// Refuse bindings targeting this resolution.
    pub fn reject_resolution(&self, resolution: Resolution) {
        self.state().rejected_resolutions.push(resolution);
    }

    pub fn stats(&self) -> PlatformStats {
        self.state().stats
    }

    pub fn bound_request(&self) -> Option<PipelineRequest> {
        self.state().binding.as_ref().map(|(_, r)| r.clone())
    }

    pub fn torch_enabled(&self) -> bool {
        self.state().torch
    }

    pub fn emit(&self, event: PlatformEvent) -> bool {
        let state = self.state();
        Self::send(&state, event)
    }

    /// Report progress of the running recording.
    pub fn emit_recording_progress(&self, bytes_recorded: u64, duration: Duration) -> bool {
        let mut state = self.state();
        let Some(recording) = state.recording.as_mut() else {
            return false;
        };
        recording.stats = RecordingStats::new(bytes_recorded, duration);
        let stats = recording.stats;
        Self::send(&state, PlatformEvent::Recording(RecordingEvent::Status(stats)))
    }

    pub fn connect_lens(&self, lens: SimulatedLens) {
        let mut state = self.state();
        state.lenses.retain(|l| l.selector.id != lens.selector.id);
        state.lenses.push(lens);
        Self::announce_lenses(&mut state);
    }

    pub fn disconnect_lens(&self, id: &str) {
        let mut state = self.state();
        state.lenses.retain(|l| l.selector.id != id);
        Self::announce_lenses(&mut state);
    }

    fn announce_lenses(state: &mut SimState) {
        let selectors = state.lenses.iter().map(|l| l.selector.clone()).collect();
        if let Some(event) = state.monitor.poll(selectors) {
            Self::send(state, event);
        }
    }

    fn send(state: &SimState, event: PlatformEvent) -> bool {
        match &state.events {
            Some(tx) => tx.send(SessionEvent::Platform(event)).is_ok(),
            None => false,
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lens_of_binding(state: &SimState) -> Option<&SimulatedLens> {
        let (_, request) = state.binding.as_ref()?;
        state.lenses.iter().find(|l| l.selector == request.lens)
    }

    fn next_media_location(state: &mut SimState, kind: &str) -> String {
        state.media_counter += 1;
        format!("content://media/external/{}/media/{}", kind, state.media_counter)
    }
}

impl CameraPlatform for SimulatedPlatform {
    fn permission_status(&self, kind: PermissionKind) -> PermissionStatus {
        let state = self.state();
        match kind {
            PermissionKind::Camera => state.camera_permission,
            PermissionKind::Audio => state.audio_permission,
        }
    }

    fn list_lenses(&self) -> Result<Vec<LensSelector>, PlatformError> {
        let state = self.state();
        if !state.camera_permission.is_granted() {
            return Err(PlatformError::PermissionDenied("camera".to_string()));
        }
        Ok(state.lenses.iter().map(|l| l.selector.clone()).collect())
    }

    fn activate_lens(&self, lens: &LensSelector) -> Result<LensInfo, PlatformError> {
        let mut state = self.state();
        if let Some(opened) = state.opened_lens.clone() {
            if opened != lens.id {
                state.stats.concurrent_activation_errors += 1;
                return Err(PlatformError::CameraInUse(opened));
            }
        }

        let found = state
            .lenses
            .iter()
            .find(|l| l.selector == *lens)
            .cloned()
            .ok_or_else(|| PlatformError::LensNotFound(lens.id.clone()))?;

        state.opened_lens = Some(lens.id.clone());
        state.stats.activations += 1;

        if found.fail_probe {
            return Err(PlatformError::Other(format!(
                "failed to read characteristics of {}",
                lens.id
            )));
        }

        Ok(LensInfo {
            quality_names: found.quality_names,
            still_resolutions: found.still_resolutions,
            has_flash_unit: found.has_flash_unit,
            zoom_range: found.zoom_range,
        })
    }

    fn release_lens(&self, lens: &LensSelector) {
        let mut state = self.state();
        if state.opened_lens.as_deref() == Some(lens.id.as_str()) {
            state.opened_lens = None;
            state.stats.releases += 1;
        }
    }

    fn bind(&self, request: &PipelineRequest) -> Result<BindingId, PlatformError> {
        let mut state = self.state();
        if state.binding.is_some() {
            state.stats.bind_while_bound += 1;
            return Err(PlatformError::CameraInUse("pipeline already bound".to_string()));
        }
        if !state.lenses.iter().any(|l| l.selector == request.lens) {
            state.stats.rejected_binds += 1;
            return Err(PlatformError::LensNotFound(request.lens.id.clone()));
        }

        let (quality, target) = match request.capture {
            CaptureOutput::Photo { target_resolution } => (None, target_resolution),
            CaptureOutput::Video {
                quality,
                target_resolution,
            } => (Some(quality), target_resolution),
        };
        if let Some(q) = quality.filter(|q| state.rejected_qualities.contains(q)) {
            state.stats.rejected_binds += 1;
            return Err(PlatformError::Unsupported(format!("quality {} rejected", q)));
        }
        if let Some(r) = target.filter(|r| state.rejected_resolutions.contains(r)) {
            state.stats.rejected_binds += 1;
            return Err(PlatformError::Unsupported(format!("resolution {} rejected", r)));
        }

        let id = BindingId(state.next_binding);
        state.next_binding += 1;
        state.binding = Some((id, request.clone()));
        state.stats.binds += 1;
        state.stats.active_bindings = 1;
        state.torch = false;
        Ok(id)
    }

    fn unbind_all(&self) {
        let mut state = self.state();
        state.stats.unbinds += 1;
        state.binding = None;
        state.stats.active_bindings = 0;
        state.torch = false;
    }

    fn start_recording(&self, request: &RecordingRequest) -> Result<(), PlatformError> {
        let mut state = self.state();
        match state.binding.as_ref() {
            Some((_, PipelineRequest {
                capture: CaptureOutput::Video { .. },
                ..
            })) => {}
            _ => return Err(PlatformError::Unsupported("no video binding".to_string())),
        }
        if state.recording.is_some() {
            return Err(PlatformError::CameraInUse("recording in progress".to_string()));
        }

        state.recording = Some(ActiveRecording {
            destination: request.destination.clone(),
            stats: RecordingStats::default(),
        });
        state.stats.recordings_started += 1;
        Self::send(
            &state,
            PlatformEvent::Recording(RecordingEvent::Start(RecordingStats::default())),
        );
        Ok(())
    }

    fn pause_recording(&self) -> Result<(), PlatformError> {
        let state = self.state();
        let recording = state
            .recording
            .as_ref()
            .ok_or_else(|| PlatformError::Other("no active recording".to_string()))?;
        let stats = recording.stats;
        Self::send(&state, PlatformEvent::Recording(RecordingEvent::Pause(stats)));
        Ok(())
    }

    fn resume_recording(&self) -> Result<(), PlatformError> {
        let state = self.state();
        let recording = state
            .recording
            .as_ref()
            .ok_or_else(|| PlatformError::Other("no active recording".to_string()))?;
        let stats = recording.stats;
        Self::send(&state, PlatformEvent::Recording(RecordingEvent::Resume(stats)));
        Ok(())
    }

    fn stop_recording(&self) -> Result<(), PlatformError> {
        let mut state = self.state();
        let recording = state
            .recording
            .take()
            .ok_or_else(|| PlatformError::Other("no active recording".to_string()))?;
        let location = Self::next_media_location(&mut state, "video");
        log::debug!(
            "Simulated recording {} saved to {}",
            recording.destination.display_name,
            location
        );
        Self::send(
            &state,
            PlatformEvent::Recording(RecordingEvent::Finalize {
                stats: recording.stats,
                output_location: location,
                error: None,
            }),
        );
        Ok(())
    }

    fn take_picture(&self, destination: &MediaDestination) -> Result<SavedMedia, PlatformError> {
        let mut state = self.state();
        match state.binding.as_ref() {
            Some((_, PipelineRequest {
                capture: CaptureOutput::Photo { .. },
                ..
            })) => {}
            _ => return Err(PlatformError::Unsupported("no photo binding".to_string())),
        }
        let location = Self::next_media_location(&mut state, "images");
        state.stats.photos_taken += 1;
        log::debug!("Simulated photo {} saved to {}", destination.display_name, location);
        Ok(SavedMedia {
            location,
            preview: Some(super::synthetic_preview(640, 480)),
        })
    }

    fn enable_torch(&self, enabled: bool) -> Result<(), PlatformError> {
        let mut state = self.state();
        let has_flash = Self::lens_of_binding(&state)
            .map(|l| l.has_flash_unit)
            .ok_or_else(|| PlatformError::Other("nothing bound".to_string()))?;
        if enabled && !has_flash {
            return Err(PlatformError::Unsupported("no flash unit".to_string()));
        }
        state.torch = enabled;
        Self::send(&state, PlatformEvent::TorchChanged(enabled));
        Ok(())
    }

    fn set_zoom_ratio(&self, ratio: f32) -> Result<(), PlatformError> {
        let mut state = self.state();
        let range = Self::lens_of_binding(&state)
            .map(|l| l.zoom_range)
            .ok_or_else(|| PlatformError::Other("nothing bound".to_string()))?;
        if ratio < range.min_ratio || ratio > range.max_ratio {
            return Err(PlatformError::Unsupported(format!("zoom {} out of range", ratio)));
        }
        state.zoom_ratio = ratio;
        Self::send(&state, PlatformEvent::ZoomChanged { ratio });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PreviewOutput;
    use crate::types::{AspectRatio, Rotation};

    fn photo_request(lens: LensSelector) -> PipelineRequest {
        PipelineRequest {
            lens,
            preview: PreviewOutput {
                aspect_ratio: AspectRatio::Ratio4x3,
                rotation: Rotation::Deg0,
            },
            capture: CaptureOutput::Photo {
                target_resolution: None,
            },
            rotation: Rotation::Deg0,
        }
    }

    #[test]
    fn test_exclusive_lens_activation() {
        let platform = SimulatedPlatform::with_default_lenses();
        let lenses = platform.list_lenses().unwrap();
        platform.activate_lens(&lenses[0]).unwrap();
        assert!(matches!(
            platform.activate_lens(&lenses[1]),
            Err(PlatformError::CameraInUse(_))
        ));
        platform.release_lens(&lenses[0]);
        assert!(platform.activate_lens(&lenses[1]).is_ok());
        assert_eq!(platform.stats().concurrent_activation_errors, 1);
    }

    #[test]
    fn test_bind_while_bound_is_refused() {
        let platform = SimulatedPlatform::with_default_lenses();
        let lens = platform.list_lenses().unwrap().remove(0);
        platform.bind(&photo_request(lens.clone())).unwrap();
        assert!(platform.bind(&photo_request(lens.clone())).is_err());
        platform.unbind_all();
        assert!(platform.bind(&photo_request(lens)).is_ok());
        assert_eq!(platform.stats().bind_while_bound, 1);
    }

    #[test]
    fn test_recording_requires_video_binding() {
        let platform = SimulatedPlatform::with_default_lenses();
        let lens = platform.list_lenses().unwrap().remove(0);
        platform.bind(&photo_request(lens)).unwrap();
        let request = RecordingRequest {
            destination: MediaDestination::new("clip", "video/mp4", "Movies"),
            audio_enabled: false,
        };
        assert!(platform.start_recording(&request).is_err());
    }

    #[test]
    fn test_denied_camera_hides_lenses() {
        let platform = SimulatedPlatform::with_default_lenses();
        platform.set_permission(PermissionKind::Camera, PermissionStatus::Denied);
        assert!(matches!(
            platform.list_lenses(),
            Err(PlatformError::PermissionDenied(_))
        ));
    }
}

//! Boundary to the host camera subsystem.
//!
//! Everything hardware-facing goes through [`CameraPlatform`]: lens
//! enumeration and capability reads, binding the capture pipeline,
//! recording commands, still capture and torch/zoom. Asynchronous
//! notifications from the host come back as [`PlatformEvent`]s on the
//! session's event channel.

pub mod lens_monitor;

use crate::analysis::FrameBuffer;
use crate::errors::PlatformError;
use crate::permissions::{PermissionKind, PermissionStatus};
use crate::photo::MediaDestination;
use crate::recording::RecordingEvent;
use crate::types::{
    AspectRatio, LensDirection, LensSelector, QualityTier, Resolution, Rotation, ZoomRange,
};
use serde::{Deserialize, Serialize};

pub use lens_monitor::LensMonitor;

/// Identifier the host assigns to an active binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingId(pub u64);

/// Raw capabilities read from an activated lens.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LensInfo {
    /// Quality names in platform order; unrecognized names are filtered later.
    pub quality_names: Vec<String>,
    pub still_resolutions: Vec<Resolution>,
    pub has_flash_unit: bool,
    pub zoom_range: ZoomRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewOutput {
    pub aspect_ratio: AspectRatio,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureOutput {
    Photo {
        target_resolution: Option<Resolution>,
    },
    Video {
        quality: QualityTier,
        target_resolution: Option<Resolution>,
    },
}

/// Full description of a pipeline to attach to the hardware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub lens: LensSelector,
    pub preview: PreviewOutput,
    pub capture: CaptureOutput,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingRequest {
    pub destination: MediaDestination,
    pub audio_enabled: bool,
}

/// Result of a still capture as persisted by the host media library.
#[derive(Debug, Clone)]
pub struct SavedMedia {
    pub location: String,
    /// Decoded pixels when the host provides them, used for the gallery thumbnail.
    pub preview: Option<image::RgbImage>,
}

/// Asynchronous notifications delivered by the host.
#[derive(Debug)]
pub enum PlatformEvent {
    LensAvailabilityChanged(Vec<LensDirection>),
    Recording(RecordingEvent),
    TorchChanged(bool),
    ZoomChanged { ratio: f32 },
    Frame(FrameBuffer),
}

/// Host camera subsystem.
///
/// Methods take `&self`: implementations own their hardware handles behind
/// interior mutability, the way a platform camera service does.
pub trait CameraPlatform: Send + Sync {
    fn permission_status(&self, kind: PermissionKind) -> PermissionStatus;

    fn list_lenses(&self) -> Result<Vec<LensSelector>, PlatformError>;

    /// Open a lens exclusively and read its capabilities. Must be paired
    /// with [`CameraPlatform::release_lens`] before another lens is opened.
    fn activate_lens(&self, lens: &LensSelector) -> Result<LensInfo, PlatformError>;

    fn release_lens(&self, lens: &LensSelector);

    fn bind(&self, request: &PipelineRequest) -> Result<BindingId, PlatformError>;

    fn unbind_all(&self);

    fn start_recording(&self, request: &RecordingRequest) -> Result<(), PlatformError>;

    fn pause_recording(&self) -> Result<(), PlatformError>;

    fn resume_recording(&self) -> Result<(), PlatformError>;

    fn stop_recording(&self) -> Result<(), PlatformError>;

    fn take_picture(&self, destination: &MediaDestination) -> Result<SavedMedia, PlatformError>;

    fn enable_torch(&self, enabled: bool) -> Result<(), PlatformError>;

    fn set_zoom_ratio(&self, ratio: f32) -> Result<(), PlatformError>;
}

//! CrabCapture: capture-mode and device-capability state for camera apps
//!
//! This crate owns the state machine that sits between a camera screen and
//! the host camera subsystem: which lenses exist and what they support,
//! what the user selected, which capture pipeline is bound, and where an
//! in-progress recording stands.
//!
//! # Features
//! - Serialized lens capability enumeration (quality tiers, still sizes, flash, zoom)
//! - Lens / quality / resolution / aspect-ratio selection with display strings
//! - Pipeline (re)binding that never holds two bindings at once
//! - Recording lifecycle with status text and UI affordances
//! - Luminosity and frame-rate analysis on a bounded background worker
//! - Photo destinations and gallery thumbnails
//! - Torch and zoom controls
//!
//! # Usage
//! ```rust,ignore
//! use crabcapture::{CameraSession, CaptureConfig, UserAction};
//! use crabcapture::testing::SimulatedPlatform;
//! use std::sync::Arc;
//!
//! let platform = Arc::new(SimulatedPlatform::with_default_lenses());
//! let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
//! platform.attach_events(tx.clone());
//!
//! let mut session = CameraSession::open(platform, CaptureConfig::default()).await?;
//! let view = session.subscribe();
//! tx.send(UserAction::TakePhoto.into())?;
//! session.run(rx).await?;
//! ```
pub mod analysis;
pub mod binder;
pub mod catalog;
pub mod config;
pub mod controls;
pub mod errors;
pub mod invariant_ppt;
pub mod permissions;
pub mod photo;
pub mod platform;
pub mod recording;
pub mod selection;
pub mod session;
pub mod types;

// Testing utilities - simulated host for offline testing
pub mod testing;

// Re-exports for convenience
pub use config::CaptureConfig;
pub use errors::{CaptureError, PlatformError, SelectionField};
pub use platform::{CameraPlatform, PlatformEvent};
pub use recording::{RecordingEvent, RecordingState, RecordingStateMachine};
pub use selection::SelectionState;
pub use session::{CameraSession, SessionEvent, UserAction, ViewState};
pub use types::{
    AspectRatio, CaptureMode, LensCapability, LensDirection, LensSelector, QualityTier, Resolution,
    Rotation,
};

/// Initialize logging for the capture system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabcapture=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

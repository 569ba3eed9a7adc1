//! Testing utilities for CrabCapture
//!
//! An in-memory [`SimulatedPlatform`] standing in for the host camera
//! subsystem, and synthetic planar frames, so sessions can be driven
//! without hardware.

pub mod simulated_platform;
pub mod synthetic_data;

pub use simulated_platform::{PlatformStats, SimulatedLens, SimulatedPlatform};
pub use synthetic_data::{gradient_frame, synthetic_frame, synthetic_preview};

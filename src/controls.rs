//! Torch and zoom state for the bound lens.

use crate::errors::CaptureError;
use crate::types::{LensCapability, ZoomRange};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TorchState {
    pub available: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    pub ratio: f32,
    pub range: ZoomRange,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self {
            ratio: 1.0,
            range: ZoomRange::default(),
        }
    }
}

impl ZoomState {
    /// Position of the current ratio within the range, 0.0 - 1.0.
    pub fn linear(&self) -> f32 {
        let span = self.range.max_ratio - self.range.min_ratio;
        if span <= f32::EPSILON {
            return 0.0;
        }
        ((self.ratio - self.range.min_ratio) / span).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraControls {
    pub torch: TorchState,
    pub zoom: ZoomState,
}

impl CameraControls {
    /// Controls for a freshly bound lens: torch off, zoom at its minimum.
    pub fn for_lens(entry: &LensCapability) -> Self {
        Self {
            torch: TorchState {
                available: entry.has_flash_unit,
                enabled: false,
            },
            zoom: ZoomState {
                ratio: entry.zoom_range.min_ratio,
                range: entry.zoom_range,
            },
        }
    }

    pub fn check_torch(&self, enabled: bool) -> Result<(), CaptureError> {
        if enabled && !self.torch.available {
            return Err(CaptureError::ControlUnsupported(
                "lens has no flash unit".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_zoom_ratio(&self, ratio: f32) -> Result<f32, CaptureError> {
        let range = self.zoom.range;
        if !ratio.is_finite() || ratio < range.min_ratio || ratio > range.max_ratio {
            return Err(CaptureError::InvalidArgument(format!(
                "zoom ratio {} outside {}..={}",
                ratio, range.min_ratio, range.max_ratio
            )));
        }
        Ok(ratio)
    }

    /// Map a 0.0 - 1.0 slider position linearly onto the zoom range.
    pub fn linear_to_ratio(&self, linear: f32) -> Result<f32, CaptureError> {
        if !(0.0..=1.0).contains(&linear) {
            return Err(CaptureError::InvalidArgument(format!(
                "linear zoom {} outside 0.0..=1.0",
                linear
            )));
        }
        let range = self.zoom.range;
        Ok(range.min_ratio + (range.max_ratio - range.min_ratio) * linear)
    }

    pub fn on_torch_changed(&mut self, enabled: bool) {
        self.torch.enabled = enabled;
    }

    /// Host notifications win over local requests; clamp to be safe.
    pub fn on_zoom_changed(&mut self, ratio: f32) {
        self.zoom.ratio = ratio
            .max(self.zoom.range.min_ratio)
            .min(self.zoom.range.max_ratio);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LensDirection, LensSelector};

    fn lens(flash: bool) -> LensCapability {
        LensCapability::new(LensSelector::new("0", LensDirection::Back), vec![])
            .with_flash_unit(flash)
            .with_zoom_range(ZoomRange {
                min_ratio: 1.0,
                max_ratio: 5.0,
            })
    }

    #[test]
    fn test_torch_requires_flash_unit() {
        let controls = CameraControls::for_lens(&lens(false));
        assert!(matches!(
            controls.check_torch(true),
            Err(CaptureError::ControlUnsupported(_))
        ));
        assert!(controls.check_torch(false).is_ok());
        assert!(CameraControls::for_lens(&lens(true)).check_torch(true).is_ok());
    }

    #[test]
    fn test_zoom_bounds() {
        let controls = CameraControls::for_lens(&lens(true));
        assert_eq!(controls.check_zoom_ratio(2.5).unwrap(), 2.5);
        assert!(controls.check_zoom_ratio(0.5).is_err());
        assert!(controls.check_zoom_ratio(f32::NAN).is_err());
        assert_eq!(controls.linear_to_ratio(0.5).unwrap(), 3.0);
        assert!(controls.linear_to_ratio(1.5).is_err());
    }

    #[test]
    fn test_zoom_notification_updates_linear() {
        let mut controls = CameraControls::for_lens(&lens(true));
        controls.on_zoom_changed(3.0);
        assert!((controls.zoom.linear() - 0.5).abs() < 1e-6);
        controls.on_zoom_changed(9.0);
        assert_eq!(controls.zoom.ratio, 5.0);
    }
}

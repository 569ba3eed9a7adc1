//! User selection of lens, quality, resolution and aspect ratio.
//!
//! The selection only stores indices and derived display strings. Rebinding
//! the pipeline after a change is the caller's job.

use crate::errors::{CaptureError, SelectionField};
use crate::types::{AspectRatio, LensCapability, QualityTier, Resolution};
use serde::{Deserialize, Serialize};

/// Shown for a field whose list is empty for the current lens.
pub const NONE_DISPLAY: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayStrings {
    pub quality: String,
    pub resolution: String,
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    lens_index: usize,
    quality_index: usize,
    resolution_index: usize,
    aspect_ratio_index: usize,
    entry: LensCapability,
    display: DisplayStrings,
}

impl SelectionState {
    /// Fresh selection on the first catalog entry.
    pub fn new(catalog: &[LensCapability]) -> Result<Self, CaptureError> {
        let entry = catalog.first().ok_or(CaptureError::NoCameraAvailable)?;
        let mut state = Self {
            lens_index: 0,
            quality_index: 0,
            resolution_index: 0,
            aspect_ratio_index: 0,
            entry: entry.clone(),
            display: DisplayStrings {
                quality: String::new(),
                resolution: String::new(),
                aspect_ratio: String::new(),
            },
        };
        state.reset(entry);
        Ok(state)
    }

    /// Point the selection at `catalog_entry` with every field back at index 0.
    pub fn reset(&mut self, catalog_entry: &LensCapability) {
        self.entry = catalog_entry.clone();
        self.quality_index = 0;
        self.resolution_index = 0;
        self.aspect_ratio_index = 0;
        self.recompute();
    }

    /// Switch lens; all other indices return to 0.
    pub fn select_lens(
        &mut self,
        catalog: &[LensCapability],
        index: usize,
    ) -> Result<&DisplayStrings, CaptureError> {
        let entry = catalog
            .get(index)
            .ok_or_else(|| out_of_range(SelectionField::Lens, index, catalog.len()))?;
        self.lens_index = index;
        self.reset(entry);
        Ok(&self.display)
    }

    /// Select `index` within `field`'s list and return the new display string.
    pub fn select(&mut self, field: SelectionField, index: usize) -> Result<String, CaptureError> {
        let len = self.len_of(field);
        if field != SelectionField::Lens && index >= len {
            return Err(out_of_range(field, index, len));
        }

        let slot = match field {
            SelectionField::Quality => &mut self.quality_index,
            SelectionField::Resolution => &mut self.resolution_index,
            SelectionField::AspectRatio => &mut self.aspect_ratio_index,
            SelectionField::Lens => {
                return Err(CaptureError::InvalidArgument(
                    "lens changes go through select_lens".to_string(),
                ))
            }
        };
        *slot = index;
        self.recompute();
        Ok(self.display_for(field).to_string())
    }

    pub fn len_of(&self, field: SelectionField) -> usize {
        match field {
            SelectionField::Lens => 1,
            SelectionField::Quality => self.entry.supported_qualities.len(),
            SelectionField::Resolution => self.entry.supported_resolutions.len(),
            SelectionField::AspectRatio => self.entry.supported_aspect_ratios.len(),
        }
    }

    pub fn index_of(&self, field: SelectionField) -> usize {
        match field {
            SelectionField::Lens => self.lens_index,
            SelectionField::Quality => self.quality_index,
            SelectionField::Resolution => self.resolution_index,
            SelectionField::AspectRatio => self.aspect_ratio_index,
        }
    }

    pub fn lens_index(&self) -> usize {
        self.lens_index
    }

    pub fn entry(&self) -> &LensCapability {
        &self.entry
    }

    pub fn display(&self) -> &DisplayStrings {
        &self.display
    }

    pub fn display_for(&self, field: SelectionField) -> &str {
        match field {
            SelectionField::Lens => self.entry.lens_selector.direction.as_str(),
            SelectionField::Quality => &self.display.quality,
            SelectionField::Resolution => &self.display.resolution,
            SelectionField::AspectRatio => &self.display.aspect_ratio,
        }
    }

    pub fn quality(&self) -> Option<QualityTier> {
        self.entry.supported_qualities.get(self.quality_index).copied()
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.entry
            .supported_resolutions
            .get(self.resolution_index)
            .copied()
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.entry
            .supported_aspect_ratios
            .get(self.aspect_ratio_index)
            .copied()
            .unwrap_or(AspectRatio::Ratio4x3)
    }

    fn recompute(&mut self) {
        self.display = DisplayStrings {
            quality: display_or_none(self.quality()),
            resolution: display_or_none(self.resolution()),
            aspect_ratio: display_or_none(
                self.entry
                    .supported_aspect_ratios
                    .get(self.aspect_ratio_index)
                    .copied(),
            ),
        };
    }
}

fn display_or_none<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NONE_DISPLAY.to_string())
}

fn out_of_range(field: SelectionField, index: usize, len: usize) -> CaptureError {
    // The view only offers valid indices; getting here means broken wiring.
    log::error!("Selection index {} out of range for {} (len {})", index, field, len);
    CaptureError::IndexOutOfRange { field, index, len }
}

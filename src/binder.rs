//! Capture pipeline (re)binding.
//!
//! The binder is the only owner of the hardware pipeline. Every bind tears
//! down the previous binding first, so the most recent request always wins
//! and two bindings never hold the hardware at once.

use crate::assert_invariant;
use crate::errors::CaptureError;
use crate::platform::{
    BindingId, CameraPlatform, CaptureOutput, PipelineRequest, PreviewOutput,
};
use crate::selection::SelectionState;
use crate::types::{CaptureMode, LensCapability, Rotation};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

const SINGLE_BINDING: &str = "At most one pipeline binding holds the hardware";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundPipeline {
    pub id: BindingId,
    pub request: PipelineRequest,
    pub mode: CaptureMode,
    pub bound_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BinderStats {
    pub binds: u64,
    pub unbinds: u64,
    pub failures: u64,
}

pub struct PipelineBinder {
    platform: Arc<dyn CameraPlatform>,
    current: Option<BoundPipeline>,
    stats: BinderStats,
}

impl PipelineBinder {
    pub fn new(platform: Arc<dyn CameraPlatform>) -> Self {
        Self {
            platform,
            current: None,
            stats: BinderStats::default(),
        }
    }

    /// Describe the pipeline for a lens, selection, mode and rotation.
    pub fn build_request(
        catalog_entry: &LensCapability,
        selection: &SelectionState,
        mode: CaptureMode,
        rotation: Rotation,
    ) -> Result<PipelineRequest, CaptureError> {
        let capture = match mode {
            CaptureMode::Photo => CaptureOutput::Photo {
                target_resolution: selection.resolution(),
            },
            CaptureMode::Video => {
                let quality = selection.quality().ok_or_else(|| {
                    CaptureError::BindingFailed(format!(
                        "{} lens has no supported video quality",
                        catalog_entry.direction()
                    ))
                })?;
                CaptureOutput::Video {
                    quality,
                    target_resolution: Some(quality.resolution()),
                }
            }
        };

        Ok(PipelineRequest {
            lens: catalog_entry.lens_selector.clone(),
            preview: PreviewOutput {
                aspect_ratio: selection.aspect_ratio(),
                rotation,
            },
            capture,
            rotation,
        })
    }

    /// Unbind whatever is bound, then bind the pipeline described by the
    /// arguments. On failure the binder is left unbound.
    pub fn bind(
        &mut self,
        catalog_entry: &LensCapability,
        selection: &SelectionState,
        mode: CaptureMode,
        rotation: Rotation,
    ) -> Result<&BoundPipeline, CaptureError> {
        self.unbind();
        assert_invariant!(self.current.is_none(), SINGLE_BINDING, "PipelineBinder::bind");

        let request = match Self::build_request(catalog_entry, selection, mode, rotation) {
            Ok(request) => request,
            Err(e) => {
                self.stats.failures += 1;
                log::error!("Cannot build {} pipeline: {}", mode, e);
                return Err(e);
            }
        };

        match self.platform.bind(&request) {
            Ok(id) => {
                self.stats.binds += 1;
                log::info!(
                    "Bound {} pipeline {:?} on {} lens (preview {}, rotation {})",
                    mode,
                    id,
                    request.lens.direction,
                    request.preview.aspect_ratio,
                    rotation.degrees()
                );
                Ok(self.current.insert(BoundPipeline {
                    id,
                    request,
                    mode,
                    bound_at: Utc::now(),
                }))
            }
            Err(e) => {
                self.stats.failures += 1;
                log::error!("Binding {} pipeline failed: {}", mode, e);
                Err(CaptureError::BindingFailed(e.to_string()))
            }
        }
    }

    /// Release the hardware. No-op when nothing is bound.
    pub fn unbind(&mut self) {
        if let Some(previous) = self.current.take() {
            self.platform.unbind_all();
            self.stats.unbinds += 1;
            log::debug!("Unbound pipeline {:?}", previous.id);
        }
    }

    pub fn current(&self) -> Option<&BoundPipeline> {
        self.current.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.current.is_some()
    }

    pub fn stats(&self) -> BinderStats {
        self.stats
    }
}

impl Drop for PipelineBinder {
    fn drop(&mut self) {
        self.unbind();
    }
}

//! Per-frame luminosity analysis.
//!
//! Frames arrive as planar luma/chroma buffers; only the luma plane is read.
//! The analyzer consumes each buffer and drops it before returning so the
//! upstream frame source never waits on us.

use crate::errors::CaptureError;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    pub data: Vec<u8>,
    pub row_stride: usize,
}

/// A planar frame from the host: plane 0 is luma, the rest chroma.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    /// Capture time relative to the frame source's start.
    pub timestamp: Duration,
    pub planes: Vec<Plane>,
}

impl FrameBuffer {
    pub fn luma_plane(&self) -> Option<&Plane> {
        self.planes.first()
    }

    /// Copy the luma plane into a tightly packed image, honouring row stride.
    pub fn luma_image(&self) -> Result<GrayImage, CaptureError> {
        let plane = self
            .luma_plane()
            .ok_or_else(|| CaptureError::InvalidArgument("frame has no luma plane".to_string()))?;
        let width = self.width as usize;
        let height = self.height as usize;
        if width == 0 || height == 0 {
            return Err(CaptureError::InvalidArgument("empty frame".to_string()));
        }
        if plane.row_stride < width {
            return Err(CaptureError::InvalidArgument(format!(
                "row stride {} shorter than width {}",
                plane.row_stride, width
            )));
        }
        let needed = plane.row_stride * (height - 1) + width;
        if plane.data.len() < needed {
            return Err(CaptureError::InvalidArgument(format!(
                "luma plane holds {} bytes, need {}",
                plane.data.len(),
                needed
            )));
        }

        let mut packed = Vec::with_capacity(width * height);
        for row in plane.data.chunks(plane.row_stride).take(height) {
            packed.extend_from_slice(&row[..width]);
        }
        GrayImage::from_raw(self.width, self.height, packed)
            .ok_or_else(|| CaptureError::InvalidArgument("luma plane size mismatch".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LumaReport {
    /// Mean luma, 0.0 - 255.0
    pub luminosity: f64,
    /// Frames per second over the analyzer window, once two frames are known.
    pub fps: Option<f64>,
    pub timestamp: Duration,
}

pub struct LuminosityAnalyzer {
    window: usize,
    timestamps: VecDeque<Duration>,
    frames_analyzed: u64,
}

impl LuminosityAnalyzer {
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            window,
            timestamps: VecDeque::with_capacity(window + 1),
            frames_analyzed: 0,
        }
    }

    /// Analyze one frame. The buffer is released when this returns.
    pub fn analyze(&mut self, frame: FrameBuffer) -> Result<LumaReport, CaptureError> {
        let luma = frame.luma_image()?;
        let timestamp = frame.timestamp;
        drop(frame);

        let sum: u64 = luma.as_raw().iter().map(|&v| v as u64).sum();
        let luminosity = sum as f64 / luma.as_raw().len() as f64;

        self.frames_analyzed += 1;
        Ok(LumaReport {
            luminosity,
            fps: self.record_timestamp(timestamp),
            timestamp,
        })
    }

    pub fn frames_analyzed(&self) -> u64 {
        self.frames_analyzed
    }

    /// Push a timestamp, evict once the window is exceeded, and compute fps
    /// from the elapsed time between the oldest and newest frame.
    fn record_timestamp(&mut self, timestamp: Duration) -> Option<f64> {
        self.timestamps.push_back(timestamp);
        while self.timestamps.len() > self.window {
            self.timestamps.pop_front();
        }

        let oldest = *self.timestamps.front()?;
        let newest = *self.timestamps.back()?;
        let elapsed = newest.checked_sub(oldest)?.as_secs_f64();
        if self.timestamps.len() < 2 || elapsed <= 0.0 {
            return None;
        }
        Some((self.timestamps.len() - 1) as f64 / elapsed)
    }
}

/// Background task running a [`LuminosityAnalyzer`] behind a bounded queue.
pub struct AnalysisWorker {
    frames: mpsc::Sender<FrameBuffer>,
    dropped: Arc<AtomicU64>,
    handle: JoinHandle<()>,
}

impl AnalysisWorker {
    /// Spawn onto the current tokio runtime; reports go to `reports`.
    pub fn spawn(
        window: usize,
        queue_capacity: usize,
        reports: mpsc::UnboundedSender<LumaReport>,
    ) -> Self {
        let (frames, mut rx) = mpsc::channel::<FrameBuffer>(queue_capacity.max(1));
        let handle = tokio::spawn(async move {
            let mut analyzer = LuminosityAnalyzer::new(window);
            while let Some(frame) = rx.recv().await {
                match analyzer.analyze(frame) {
                    Ok(report) => {
                        if reports.send(report).is_err() {
                            break;
                        }
                    }
                    Err(e) => log::warn!("Frame analysis failed: {}", e),
                }
            }
            log::debug!("Analysis worker stopped after {} frames", analyzer.frames_analyzed());
        });

        Self {
            frames,
            dropped: Arc::new(AtomicU64::new(0)),
            handle,
        }
    }

    /// Queue a frame without waiting. A full queue drops the frame.
    pub fn submit(&self, frame: FrameBuffer) -> bool {
        match self.frames.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::warn!("Analysis queue full, dropped frame ({} total)", dropped);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::warn!("Analysis worker is gone, frame discarded");
                false
            }
        }
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

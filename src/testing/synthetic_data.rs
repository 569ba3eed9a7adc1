//! Synthetic frames in the host's planar YUV 4:2:0 layout.

use crate::analysis::{FrameBuffer, Plane};
use image::RgbImage;
use std::time::Duration;

/// A frame whose luma plane is uniformly `luma`, with neutral chroma.
pub fn synthetic_frame(width: u32, height: u32, luma: u8, timestamp: Duration) -> FrameBuffer {
    let w = width as usize;
    let h = height as usize;
    let chroma = (w.div_ceil(2)) * (h.div_ceil(2));

    FrameBuffer {
        width,
        height,
        timestamp,
        planes: vec![
            Plane {
                data: vec![luma; w * h],
                row_stride: w,
            },
            Plane {
                data: vec![128; chroma],
                row_stride: w.div_ceil(2),
            },
            Plane {
                data: vec![128; chroma],
                row_stride: w.div_ceil(2),
            },
        ],
    }
}

/// A frame with a horizontal luma ramp that shifts with `frame_number`.
pub fn gradient_frame(frame_number: u64, width: u32, height: u32, fps: u32) -> FrameBuffer {
    let mut frame = synthetic_frame(
        width,
        height,
        0,
        Duration::from_secs_f64(frame_number as f64 / fps.max(1) as f64),
    );
    let base = (frame_number % 256) as u8;
    let w = width as usize;
    for (i, px) in frame.planes[0].data.iter_mut().enumerate() {
        *px = base.wrapping_add(((i % w) % 256) as u8);
    }
    frame
}

/// Decoded still as the host would hand back after a capture.
pub fn synthetic_preview(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

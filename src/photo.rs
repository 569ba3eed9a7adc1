//! Media destinations and the gallery thumbnail.

use crate::config::{PhotoConfig, RecordingConfig};
use chrono::{DateTime, Local, TimeZone, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Display-name pattern for captured media, millisecond precision.
pub const FILENAME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%3f";

/// Where the host media library should persist a capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDestination {
    pub display_name: String,
    pub mime_type: String,
    /// Relative path of the storage collection, e.g. `Pictures/CrabCapture-Image`.
    pub collection: String,
}

impl MediaDestination {
    pub fn new(
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            mime_type: mime_type.into(),
            collection: collection.into(),
        }
    }

    pub fn photo_at<Tz: TimeZone>(config: &PhotoConfig, time: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self::new(
            display_name_at(time),
            config.mime_type.clone(),
            config.collection.clone(),
        )
    }

    pub fn photo(config: &PhotoConfig) -> Self {
        Self::photo_at(config, &Local::now())
    }

    pub fn video_at<Tz: TimeZone>(config: &RecordingConfig, time: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self::new(
            display_name_at(time),
            config.mime_type.clone(),
            config.collection.clone(),
        )
    }

    pub fn video(config: &RecordingConfig) -> Self {
        Self::video_at(config, &Local::now())
    }
}

pub fn display_name_at<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format(FILENAME_FORMAT).to_string()
}

/// Most recent capture, shown as the gallery button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub location: String,
    pub display_name: String,
    pub captured_at: DateTime<Utc>,
    pub thumbnail_size: Option<(u32, u32)>,
}

/// Scale `preview` so its longer edge is at most `max_edge`, keeping the
/// aspect ratio. Images already small enough are returned as-is.
pub fn gallery_thumbnail(preview: &RgbImage, max_edge: u32) -> RgbImage {
    let (width, height) = preview.dimensions();
    let longest = width.max(height);
    if longest <= max_edge || max_edge == 0 {
        return preview.clone();
    }

    let scale = max_edge as f64 / longest as f64;
    let new_width = ((width as f64 * scale).round() as u32).max(1);
    let new_height = ((height as f64 * scale).round() as u32).max(1);
    image::imageops::thumbnail(preview, new_width, new_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureConfig;
    use chrono::TimeZone;

    #[test]
    fn test_display_name_pattern() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(display_name_at(&time), "2024-03-09-14-05-07-042");
    }

    #[test]
    fn test_photo_destination_uses_config() {
        let config = CaptureConfig::default();
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let dest = MediaDestination::photo_at(&config.photo, &time);
        assert_eq!(dest.display_name, "2024-01-01-00-00-00-000");
        assert_eq!(dest.mime_type, "image/jpeg");
        assert_eq!(dest.collection, "Pictures/CrabCapture-Image");

        let video = MediaDestination::video_at(&config.recording, &time);
        assert_eq!(video.mime_type, "video/mp4");
        assert_eq!(video.collection, "Movies/CrabCapture-Video");
    }

    #[test]
    fn test_thumbnail_keeps_aspect_ratio() {
        let preview = RgbImage::from_pixel(400, 300, image::Rgb([10, 20, 30]));
        let thumb = gallery_thumbnail(&preview, 100);
        assert_eq!(thumb.dimensions(), (100, 75));

        let small = RgbImage::new(50, 20);
        assert_eq!(gallery_thumbnail(&small, 100).dimensions(), (50, 20));
    }
}

//! Configuration management for CrabCapture
//!
//! Loads and saves the session defaults (lens, mode), media destinations
//! and frame-analysis tuning from a TOML file.

use crate::errors::CaptureError;
use crate::types::{CaptureMode, LensDirection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub camera: CameraConfig,
    pub photo: PhotoConfig,
    pub recording: RecordingConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Lens selected when the session opens, if the device has one
    pub default_lens: LensDirection,
    /// Capture mode bound when the session opens
    pub default_mode: CaptureMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoConfig {
    /// Storage collection (relative path) for still captures
    pub collection: String,
    pub mime_type: String,
    /// Longest edge of the gallery thumbnail in pixels
    pub thumbnail_max_edge: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Storage collection (relative path) for videos
    pub collection: String,
    pub mime_type: String,
    /// Record audio when the microphone permission allows it
    pub audio_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub enabled: bool,
    /// Number of frame timestamps in the frames-per-second window
    pub fps_window: usize,
    /// Frames waiting for analysis before new ones are dropped
    pub queue_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                default_lens: LensDirection::Back,
                default_mode: CaptureMode::Photo,
            },
            photo: PhotoConfig {
                collection: "Pictures/CrabCapture-Image".to_string(),
                mime_type: "image/jpeg".to_string(),
                thumbnail_max_edge: 160,
            },
            recording: RecordingConfig {
                collection: "Movies/CrabCapture-Video".to_string(),
                mime_type: "video/mp4".to_string(),
                audio_enabled: true,
            },
            analysis: AnalysisConfig {
                enabled: true,
                fps_window: 8,
                queue_capacity: 2,
            },
        }
    }
}

impl CaptureConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CaptureError::Config(format!("Failed to read config file: {}", e)))?;

        let config: CaptureConfig = toml::from_str(&contents)
            .map_err(|e| CaptureError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate().map_err(CaptureError::Config)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CaptureError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CaptureError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CaptureError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CaptureError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("crabcapture.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.photo.collection.trim().is_empty() {
            return Err("Photo collection must not be empty".to_string());
        }
        if !self.photo.mime_type.starts_with("image/") {
            return Err("Photo MIME type must be an image type".to_string());
        }
        if self.photo.thumbnail_max_edge == 0 {
            return Err("Thumbnail edge must be positive".to_string());
        }

        if self.recording.collection.trim().is_empty() {
            return Err("Recording collection must not be empty".to_string());
        }
        if !self.recording.mime_type.starts_with("video/") {
            return Err("Recording MIME type must be a video type".to_string());
        }

        if self.analysis.fps_window < 2 || self.analysis.fps_window > 240 {
            return Err("FPS window must be between 2 and 240 frames".to_string());
        }
        if self.analysis.queue_capacity == 0 {
            return Err("Analysis queue capacity must be at least 1".to_string());
        }

        Ok(())
    }
}

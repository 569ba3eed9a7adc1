//! Core data types shared by the catalog, selection, binder and session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical facing of a lens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LensDirection {
    Back,
    Front,
    External,
}

impl LensDirection {
    /// Catalog order: the platform's default-lens preference.
    pub const ALL: [LensDirection; 3] = [
        LensDirection::Back,
        LensDirection::Front,
        LensDirection::External,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LensDirection::Back => "back",
            LensDirection::Front => "front",
            LensDirection::External => "external",
        }
    }
}

impl fmt::Display for LensDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LensDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "back" => Ok(LensDirection::Back),
            "front" => Ok(LensDirection::Front),
            "external" => Ok(LensDirection::External),
            other => Err(format!("unknown lens direction: {}", other)),
        }
    }
}

/// Opaque platform handle identifying a physical camera unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LensSelector {
    pub id: String,
    pub direction: LensDirection,
}

impl LensSelector {
    pub fn new(id: impl Into<String>, direction: LensDirection) -> Self {
        Self {
            id: id.into(),
            direction,
        }
    }
}

/// Coarse video-resolution class, ordered by resolution descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityTier {
    UHD,
    FHD,
    HD,
    SD,
}

impl QualityTier {
    pub const ALL: [QualityTier; 4] = [
        QualityTier::UHD,
        QualityTier::FHD,
        QualityTier::HD,
        QualityTier::SD,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            QualityTier::UHD => "UHD",
            QualityTier::FHD => "FHD",
            QualityTier::HD => "HD",
            QualityTier::SD => "SD",
        }
    }

    /// Recognize a platform-reported tier name. Anything outside the
    /// closed set (e.g. "LOWEST", "HIGHEST") yields `None`.
    pub fn from_platform_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "UHD" | "2160P" => Some(QualityTier::UHD),
            "FHD" | "1080P" => Some(QualityTier::FHD),
            "HD" | "720P" => Some(QualityTier::HD),
            "SD" | "480P" => Some(QualityTier::SD),
            _ => None,
        }
    }

    /// Nominal 16:9 video size of the tier.
    pub fn resolution(&self) -> Resolution {
        match self {
            QualityTier::UHD => Resolution::new(3840, 2160),
            QualityTier::FHD => Resolution::new(1920, 1080),
            QualityTier::HD => Resolution::new(1280, 720),
            QualityTier::SD => Resolution::new(720, 480),
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    Ratio4x3,
    Ratio16x9,
}

impl AspectRatio {
    /// Default list offered for every lens; the first entry is the default.
    pub const ALL: [AspectRatio; 2] = [AspectRatio::Ratio4x3, AspectRatio::Ratio16x9];

    pub fn numerator(&self) -> u32 {
        match self {
            AspectRatio::Ratio4x3 => 4,
            AspectRatio::Ratio16x9 => 16,
        }
    }

    pub fn denominator(&self) -> u32 {
        match self {
            AspectRatio::Ratio4x3 => 3,
            AspectRatio::Ratio16x9 => 9,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator(), self.denominator())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CaptureMode {
    #[default]
    Photo,
    Video,
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureMode::Photo => write!(f, "photo"),
            CaptureMode::Video => write!(f, "video"),
        }
    }
}

impl std::str::FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "photo" => Ok(CaptureMode::Photo),
            "video" => Ok(CaptureMode::Video),
            other => Err(format!("unknown capture mode: {}", other)),
        }
    }
}

/// Target rotation of the capture outputs, following device orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Snap an arbitrary orientation reading to the nearest quarter turn.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            45..=134 => Rotation::Deg90,
            135..=224 => Rotation::Deg180,
            225..=314 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }
}

/// Zoom range supported by a lens, as ratios (1.0 = no zoom).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min_ratio: f32,
    pub max_ratio: f32,
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self {
            min_ratio: 1.0,
            max_ratio: 1.0,
        }
    }
}

/// Everything the catalog learned about one lens. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LensCapability {
    pub lens_selector: LensSelector,
    pub supported_qualities: Vec<QualityTier>,
    pub supported_resolutions: Vec<Resolution>,
    pub supported_aspect_ratios: Vec<AspectRatio>,
    pub has_flash_unit: bool,
    pub zoom_range: ZoomRange,
}

impl LensCapability {
    pub fn new(lens_selector: LensSelector, supported_qualities: Vec<QualityTier>) -> Self {
        Self {
            lens_selector,
            supported_qualities,
            supported_resolutions: Vec::new(),
            supported_aspect_ratios: AspectRatio::ALL.to_vec(),
            has_flash_unit: false,
            zoom_range: ZoomRange::default(),
        }
    }

    /// Set still-capture sizes; stored sorted by area descending.
    pub fn with_resolutions(mut self, mut resolutions: Vec<Resolution>) -> Self {
        resolutions.sort_by(|a, b| {
            b.area()
                .cmp(&a.area())
                .then(b.width.cmp(&a.width))
                .then(b.height.cmp(&a.height))
        });
        resolutions.dedup();
        self.supported_resolutions = resolutions;
        self
    }

    pub fn with_flash_unit(mut self, has_flash_unit: bool) -> Self {
        self.has_flash_unit = has_flash_unit;
        self
    }

    pub fn with_zoom_range(mut self, zoom_range: ZoomRange) -> Self {
        self.zoom_range = zoom_range;
        self
    }

    pub fn direction(&self) -> LensDirection {
        self.lens_selector.direction
    }
}

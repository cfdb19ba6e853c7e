//! Parameter types shared by the Wand, the codecs and the configuration file.
//!
//! - [`CompressionLevel`]: `-1` (codec default) or `0..=100`, clamped on
//!   construction. 0 is least compression, 100 is most; what a level means
//!   to a given format is up to its encoder.
//! - [`ResizeStrategy`]: which interpolation kernel a resize uses.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Encoder effort/size trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct CompressionLevel(i32);

impl CompressionLevel {
    /// Let the codec pick.
    pub const DEFAULT: Self = Self(-1);

    /// Negative values mean "codec default"; values above 100 clamp to 100.
    pub fn new(level: i32) -> Self {
        if level < 0 { Self::DEFAULT } else { Self(level.min(100)) }
    }

    /// Level from a lossy quality setting: `level = 100 - quality`.
    pub fn from_quality(quality: u32) -> Self {
        Self(100 - quality.min(100) as i32)
    }

    pub fn value(self) -> i32 {
        self.0
    }

    pub fn is_default(self) -> bool {
        self.0 < 0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i32> for CompressionLevel {
    fn from(level: i32) -> Self {
        Self::new(level)
    }
}

impl From<CompressionLevel> for i32 {
    fn from(level: CompressionLevel) -> Self {
        level.0
    }
}

/// Interpolation used when resampling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeStrategy {
    Nearest,
    #[default]
    Bilinear,
    Lanczos3,
}

impl ResizeStrategy {
    pub fn filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

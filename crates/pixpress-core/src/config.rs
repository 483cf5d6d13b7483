//! Pipeline configuration.
//!
//! Every field has a default, so hosts only pass the values they want to
//! change (e.g. `{ "max_page_dim": 1600 }` from JavaScript).

use serde::{Deserialize, Serialize};

use crate::encode::{FilterType, Quality, MAX_QUALITY, MIN_QUALITY};

/// Default quality of the compress tool's slider (percent).
pub const DEFAULT_QUALITY_PERCENT: u32 = 75;
/// Default max width of the compress tool (pixels).
pub const DEFAULT_MAX_WIDTH: u32 = 1024;
/// Default quality of the convert tool (percent).
pub const DEFAULT_CONVERT_QUALITY_PERCENT: u32 = 90;
/// Longest page edge in the assembled document (points).
pub const MAX_PAGE_DIM: u32 = 2000;

/// Tunables shared by all tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Quality used when a caller does not supply one (percent, 1-100).
    pub default_quality: u32,
    /// Max width used when a caller does not supply one; 0 = unconstrained.
    pub default_max_width: u32,
    /// Convert tool's quality when the caller passes none (percent, 1-100).
    pub convert_quality: u32,
    /// Convert tool's max width when the caller passes none; 0 keeps the native width.
    pub convert_max_width: u32,
    /// Longest edge of a document page.
    pub max_page_dim: u32,
    /// Interpolation used when scaling.
    pub filter: FilterType,
    /// Lower bound applied to requested quality (fraction).
    pub min_quality: f32,
    /// Upper bound applied to requested quality (fraction).
    pub max_quality: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_quality: DEFAULT_QUALITY_PERCENT,
            default_max_width: DEFAULT_MAX_WIDTH,
            convert_quality: DEFAULT_CONVERT_QUALITY_PERCENT,
            convert_max_width: 0,
            max_page_dim: MAX_PAGE_DIM,
            filter: FilterType::Bilinear,
            min_quality: MIN_QUALITY,
            max_quality: MAX_QUALITY,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamp a requested quality fraction into the configured band.
    ///
    /// The configured band is itself kept inside `[MIN_QUALITY, MAX_QUALITY]`.
    pub fn quality(&self, fraction: f32) -> Quality {
        let lo = self.min_quality.clamp(MIN_QUALITY, MAX_QUALITY);
        let hi = self.max_quality.clamp(lo, MAX_QUALITY);
        let value = if fraction.is_nan() { hi } else { fraction.clamp(lo, hi) };
        Quality::from_fraction(value)
    }

    /// Clamp a requested quality percentage into the configured band.
    pub fn quality_percent(&self, percent: u32) -> Quality {
        self.quality(percent.min(100) as f32 / 100.0)
    }
}

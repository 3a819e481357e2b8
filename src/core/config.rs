use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Lower bound of the packed-color range the histogram accepts (exclusive).
pub const PACKED_RANGE_MIN: i32 = -15_000_000;
/// Upper bound of the packed-color range the histogram accepts (exclusive).
pub const PACKED_RANGE_MAX: i32 = -8_000_000;

/// Per-pixel value fed into the color histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMetric {
    /// Mean packed ARGB over a `2r x 2r` window around the pixel
    BlurredArgb,
    /// Packed ARGB of the pixel itself
    Argb,
    /// Hue angle in whole degrees
    Hue,
}

impl ColorMetric {
    /// Whether observations are restricted to the plausible packed-color range.
    pub fn uses_range_filter(self) -> bool {
        !matches!(self, ColorMetric::Hue)
    }
}

/// How the `Low` size tier is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum LowPolicy {
    /// Everything that is neither High nor Middle
    #[default]
    Complement,
    /// Only images with both sides under 600 px
    Literal,
}

/// Built-in threshold sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum Preset {
    /// Local-average packed colors on a 1/6 downscale
    #[default]
    Blurred,
    /// Raw packed colors on a 1/4 downscale
    Packed,
    /// Hue angles on a 1/4 downscale
    Hue,
}

/// Thresholds and choices driving one classification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub max_color_difference: i32,
    pub blur_radius: u32,
    pub min_size: u32,
    /// Downscale divisor applied to both sides before sampling
    pub reduction: u32,
    pub metric: ColorMetric,
    pub low_policy: LowPolicy,
}

impl SortConfig {
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Blurred => Self {
                max_color_difference: 10,
                blur_radius: 2,
                min_size: 6,
                reduction: 6,
                metric: ColorMetric::BlurredArgb,
                low_policy: LowPolicy::Complement,
            },
            Preset::Packed => Self {
                max_color_difference: 20,
                blur_radius: 0,
                min_size: 4,
                reduction: 4,
                metric: ColorMetric::Argb,
                low_policy: LowPolicy::Complement,
            },
            Preset::Hue => Self {
                max_color_difference: 10,
                blur_radius: 0,
                min_size: 4,
                reduction: 4,
                metric: ColorMetric::Hue,
                low_policy: LowPolicy::Complement,
            },
        }
    }

    pub fn with_low_policy(mut self, low_policy: LowPolicy) -> Self {
        self.low_policy = low_policy;
        self
    }

    /// Smallest width and height an image may have before sampling.
    pub fn required_side(&self) -> u32 {
        (self.min_size + 2 * self.blur_radius).max(self.reduction.max(1))
    }

    /// Pixels skipped on every edge of the downscaled grid.
    pub fn margin(&self) -> u32 {
        self.blur_radius
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        Self::from_preset(Preset::default())
    }
}

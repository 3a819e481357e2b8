use crate::core::config::SortConfig;
use crate::core::histogram::extract_dominant_color;
use crate::core::sampler::sample_file;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to decode {}: {source}", .path.display())]
    DecodeFailure {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Image must be at least {required}x{required}, got {width}x{height}")]
    ImageTooSmall {
        width: u32,
        height: u32,
        required: u32,
    },

    #[error("Downscaled grid {width}x{height} has no interior pixels")]
    EmptyPixelGrid { width: u32, height: u32 },

    #[error("No sampled pixel fell inside the accepted color range")]
    NoColorSamples,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What the classifier needs to know about one source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageProfile {
    pub path: PathBuf,
    pub size: Size,
    pub dominant_color: i32,
}

impl ImageProfile {
    pub fn new(path: impl Into<PathBuf>, size: Size, dominant_color: i32) -> Self {
        Self {
            path: path.into(),
            size,
            dominant_color,
        }
    }

    /// Decode, downscale and histogram one image. All decoding buffers are
    /// released before this returns, whatever the outcome.
    pub fn from_path(path: &Path, config: &SortConfig) -> Result<Self, ProfileError> {
        let sampled = sample_file(path, config)?;
        let dominant_color = extract_dominant_color(&sampled.grid, config)?;

        tracing::debug!(
            path = %path.display(),
            size = %sampled.size,
            fast_path = sampled.grid.fast_path(),
            dominant_color,
            "profiled image"
        );

        Ok(Self {
            path: path.to_path_buf(),
            size: sampled.size,
            dominant_color,
        })
    }
}

use crate::core::config::{LowPolicy, SortConfig};
use crate::core::profile::{ImageProfile, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("{} ({size}) matches no {axis} group", .path.display())]
    UnclassifiedImage {
        path: PathBuf,
        size: Size,
        axis: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShapeLabel {
    Vertical,
    Square,
    Horizontal,
}

impl ShapeLabel {
    pub const ALL: [ShapeLabel; 3] = [Self::Vertical, Self::Square, Self::Horizontal];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vertical => "Vertical",
            Self::Square => "Square",
            Self::Horizontal => "Horizontal",
        }
    }
}

impl fmt::Display for ShapeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SizeLabel {
    Low,
    Middle,
    High,
}

impl SizeLabel {
    pub const ALL: [SizeLabel; 3] = [Self::Low, Self::Middle, Self::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Middle => "Middle",
            Self::High => "High",
        }
    }
}

impl fmt::Display for SizeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output bucket of an image: shape first, then size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub shape: ShapeLabel,
    pub size: SizeLabel,
}

impl GroupKey {
    pub fn new(shape: ShapeLabel, size: SizeLabel) -> Self {
        Self { shape, size }
    }

    /// All nine keys in output order.
    pub fn all() -> impl Iterator<Item = GroupKey> {
        ShapeLabel::ALL.into_iter().flat_map(|shape| {
            SizeLabel::ALL
                .into_iter()
                .map(move |size| GroupKey::new(shape, size))
        })
    }

    /// `<Shape>/<Size>` below the output root.
    pub fn relative_dir(&self) -> PathBuf {
        PathBuf::from(self.shape.as_str()).join(self.size.as_str())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.shape, self.size)
    }
}

pub type Predicate = fn(Size) -> bool;

pub fn is_vertical(size: Size) -> bool {
    size.aspect_ratio() <= 0.9
}

pub fn is_square(size: Size) -> bool {
    let ratio = size.aspect_ratio();
    ratio > 0.9 && ratio < 1.1
}

pub fn is_horizontal(size: Size) -> bool {
    size.aspect_ratio() >= 1.1
}

pub fn is_high(Size { width, height }: Size) -> bool {
    (width >= 1900 && height >= 1000) || (width >= 1000 && height >= 1900)
}

pub fn is_middle(size: Size) -> bool {
    !is_high(size) && size.width >= 600 && size.height >= 600
}

pub fn is_low_complement(size: Size) -> bool {
    !is_high(size) && !is_middle(size)
}

pub fn is_low_literal(size: Size) -> bool {
    !is_high(size) && size.width < 600 && size.height < 600
}

/// Ordered predicate lists; the first matching label wins on each axis.
#[derive(Debug, Clone)]
pub struct Classifier {
    shapes: Vec<(ShapeLabel, Predicate)>,
    sizes: Vec<(SizeLabel, Predicate)>,
}

impl Classifier {
    pub fn new(low_policy: LowPolicy) -> Self {
        let low: Predicate = match low_policy {
            LowPolicy::Complement => is_low_complement,
            LowPolicy::Literal => is_low_literal,
        };

        Self {
            shapes: vec![
                (ShapeLabel::Vertical, is_vertical),
                (ShapeLabel::Square, is_square),
                (ShapeLabel::Horizontal, is_horizontal),
            ],
            sizes: vec![
                (SizeLabel::Low, low),
                (SizeLabel::Middle, is_middle),
                (SizeLabel::High, is_high),
            ],
        }
    }

    pub fn from_config(config: &SortConfig) -> Self {
        Self::new(config.low_policy)
    }

    pub fn shape_of(&self, size: Size) -> Option<ShapeLabel> {
        if size.is_degenerate() {
            return None;
        }
        self.shapes
            .iter()
            .find(|(_, predicate)| predicate(size))
            .map(|(label, _)| *label)
    }

    pub fn size_of(&self, size: Size) -> Option<SizeLabel> {
        if size.is_degenerate() {
            return None;
        }
        self.sizes
            .iter()
            .find(|(_, predicate)| predicate(size))
            .map(|(label, _)| *label)
    }

    pub fn classify(&self, profile: &ImageProfile) -> Result<GroupKey, ClassifyError> {
        let unclassified = |axis| ClassifyError::UnclassifiedImage {
            path: profile.path.clone(),
            size: profile.size,
            axis,
        };

        let shape = self
            .shape_of(profile.size)
            .ok_or_else(|| unclassified("shape"))?;
        let size = self
            .size_of(profile.size)
            .ok_or_else(|| unclassified("size"))?;
        Ok(GroupKey::new(shape, size))
    }

    /// Split profiles into classified pairs and failures, keeping input order.
    pub fn classify_all(
        &self,
        profiles: Vec<ImageProfile>,
    ) -> (Vec<(GroupKey, ImageProfile)>, Vec<ClassifyError>) {
        let mut classified = Vec::with_capacity(profiles.len());
        let mut unclassified = Vec::new();

        for profile in profiles {
            match self.classify(&profile) {
                Ok(key) => classified.push((key, profile)),
                Err(err) => unclassified.push(err),
            }
        }

        (classified, unclassified)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(LowPolicy::default())
    }
}

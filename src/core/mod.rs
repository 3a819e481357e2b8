pub mod classifier;
pub mod config;
pub mod histogram;
pub mod profile;
pub mod sampler;
pub mod sorter;

pub use classifier::{Classifier, ClassifyError, GroupKey, ShapeLabel, SizeLabel};
pub use config::{ColorMetric, LowPolicy, Preset, SortConfig};
pub use histogram::{ColorBucket, ColorHistogram};
pub use profile::{ImageProfile, ProfileError, Size};
pub use sampler::{PixelGrid, PixelSource};
pub use sorter::SortedGroups;

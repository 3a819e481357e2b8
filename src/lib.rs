//! Sort a picture collection into `<Shape>/<Size>/Art<n>` folders ordered by
//! dominant color, dropping byte-identical duplicates along the way.

pub mod core;
pub mod pipeline;
pub mod services;

pub use crate::core::{Classifier, GroupKey, ImageProfile, SortConfig};
pub use crate::pipeline::{RunOptions, RunOutcome, RunSummary};

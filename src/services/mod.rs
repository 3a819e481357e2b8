pub mod hash;
pub mod history;
pub mod save;
pub mod scanner;

pub use hash::{DedupOutcome, DedupReport, HashError};
pub use history::{HistoryError, RestoreSelection, RunRecord};
pub use save::{Placement, SaveError, SaveMode, SaveReport};
pub use scanner::{ScanError, ScanOptions};

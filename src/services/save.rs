use crate::core::classifier::GroupKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("Copy image {} → {}: {source}", .from.display(), .to.display())]
    CopyFailure {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveMode {
    Copy,
    Move,
}

impl SaveMode {
    /// Past-tense verb recorded in the history file.
    pub fn action(self) -> &'static str {
        match self {
            Self::Copy => "copied",
            Self::Move => "moved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub source: PathBuf,
    pub target: PathBuf,
}

#[derive(Debug, Default)]
pub struct SaveReport {
    pub placements: Vec<Placement>,
    pub failures: Vec<SaveError>,
    /// Files not attempted because their group directory was unusable
    pub skipped: usize,
}

/// `Art<index>.<ext>`, keeping the source extension as written.
pub fn target_name(index: usize, source: &Path) -> String {
    match source.extension() {
        Some(ext) => format!("Art{}.{}", index, ext.to_string_lossy()),
        None => format!("Art{}", index),
    }
}

/// Place every group under `<output_root>/<Shape>/<Size>/`. Indices are
/// zero-based and only advance on success, so each directory stays
/// contiguous. With `dry_run` nothing is touched and every placement is
/// reported as planned.
pub fn save_groups(
    groups: &BTreeMap<GroupKey, Vec<PathBuf>>,
    output_root: &Path,
    mode: SaveMode,
    dry_run: bool,
) -> SaveReport {
    let mut report = SaveReport::default();

    for (key, paths) in groups {
        let dir = output_root.join(key.relative_dir());
        if !dry_run {
            if let Err(source) = fs::create_dir_all(&dir) {
                report.failures.push(SaveError::CreateDir { path: dir, source });
                report.skipped += paths.len();
                continue;
            }
        }

        let mut index = 0;
        for source in paths {
            let target = dir.join(target_name(index, source));
            let result = if dry_run {
                check_target(&target)
            } else {
                place_file(source, &target, mode)
            };

            match result {
                Ok(()) => {
                    report.placements.push(Placement {
                        source: source.clone(),
                        target,
                    });
                    index += 1;
                }
                Err(err) => report.failures.push(SaveError::CopyFailure {
                    from: source.clone(),
                    to: target,
                    source: err,
                }),
            }
        }

        if index == paths.len() {
            tracing::info!("Saved all {} image(s) in group {}", index, key);
        } else {
            tracing::warn!("Saved {}/{} image(s) in group {}", index, paths.len(), key);
        }
    }

    report
}

fn check_target(target: &Path) -> io::Result<()> {
    if target.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "target already exists",
        ));
    }
    Ok(())
}

/// Copy or move `source` onto `target`, never overwriting.
pub fn place_file(source: &Path, target: &Path, mode: SaveMode) -> io::Result<()> {
    check_target(target)?;
    match mode {
        SaveMode::Copy => fs::copy(source, target).map(|_| ()),
        SaveMode::Move => move_file(source, target),
    }
}

/// Rename, falling back to copy + delete when the rename crosses devices.
pub fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    if fs::rename(source, target).is_ok() {
        return Ok(());
    }
    fs::copy(source, target)?;
    fs::remove_file(source)
}

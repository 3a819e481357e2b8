use crate::pipeline::RunSummary;
use crate::services::save::{Placement, SaveMode, move_file};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const HISTORY_FILE: &str = ".picsort-history.jsonl";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode history record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("No valid 'moved' history records to restore")]
    NothingToRestore,

    #[error("Invalid history index {index}; valid range is 0..={max}")]
    InvalidIndex { index: usize, max: usize },

    #[error("History entry {index} is not a valid 'moved' record")]
    NotRestorable { index: usize },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub timestamp: String,
    pub action: String, // "copied" or "moved"
    pub summary: RunSummary,
    pub placements: Vec<Placement>,
}

impl RunRecord {
    pub fn new(mode: SaveMode, summary: RunSummary, placements: Vec<Placement>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            action: mode.action().to_string(),
            summary,
            placements,
        }
    }

    pub fn is_moved(&self) -> bool {
        self.action == SaveMode::Move.action()
    }
}

pub fn history_path(output_root: &Path) -> PathBuf {
    output_root.join(HISTORY_FILE)
}

pub fn append_record(output_root: &Path, record: &RunRecord) -> Result<(), HistoryError> {
    let path = history_path(output_root);
    let io_err = |source| HistoryError::Io {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(output_root).map_err(io_err)?;
    let mut out = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(io_err)?;
    writeln!(out, "{}", serde_json::to_string(record)?).map_err(io_err)?;
    Ok(())
}

/// One line of the history file, parsed or not.
#[derive(Debug)]
pub struct HistoryLine {
    pub raw: String,
    pub record: Result<RunRecord, serde_json::Error>,
}

pub fn read_history(output_root: &Path) -> Result<Vec<HistoryLine>, HistoryError> {
    let path = history_path(output_root);
    let io_err = |source| HistoryError::Io {
        path: path.clone(),
        source,
    };

    let reader = BufReader::new(File::open(&path).map_err(io_err)?);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let raw = line.map_err(io_err)?;
        if raw.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&raw);
        lines.push(HistoryLine { raw, record });
    }
    Ok(lines)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSelection {
    Last,
    Index(usize),
    All,
}

#[derive(Debug, Default)]
pub struct RestoreReport {
    /// Records fully restored and dropped from the history
    pub records: usize,
    /// Records kept because some of their files could not be moved back
    pub kept: usize,
    pub restored: Vec<Placement>,
    pub skipped: Vec<(Placement, String)>,
}

/// Move the files of selected `moved` records back to where they came from.
/// Indices are positions in the history file, as `history list` prints them.
/// A record is dropped once all its files are back; otherwise it is
/// rewritten to hold only the placements still waiting to be restored.
pub fn restore(
    output_root: &Path,
    selection: RestoreSelection,
) -> Result<RestoreReport, HistoryError> {
    let mut lines = read_history(output_root)?;
    let moved: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.record.as_ref().is_ok_and(RunRecord::is_moved))
        .map(|(i, _)| i)
        .collect();

    let chosen: Vec<usize> = match selection {
        RestoreSelection::Index(index) if index >= lines.len() => {
            return Err(HistoryError::InvalidIndex {
                index,
                max: lines.len().saturating_sub(1),
            });
        }
        RestoreSelection::Index(index) if !moved.contains(&index) => {
            return Err(HistoryError::NotRestorable { index });
        }
        RestoreSelection::Index(index) => vec![index],
        RestoreSelection::Last => match moved.last() {
            Some(&line) => vec![line],
            None => return Err(HistoryError::NothingToRestore),
        },
        RestoreSelection::All if moved.is_empty() => {
            return Err(HistoryError::NothingToRestore);
        }
        RestoreSelection::All => moved,
    };

    let mut report = RestoreReport::default();
    let mut dropped = Vec::new();
    for &index in &chosen {
        let line = &mut lines[index];
        let Ok(record) = &mut line.record else {
            continue;
        };

        let mut pending = Vec::new();
        for placement in &record.placements {
            match restore_placement(placement) {
                Ok(()) => report.restored.push(placement.clone()),
                Err(reason) => {
                    tracing::warn!(
                        "Skipping {} → {}: {}",
                        placement.target.display(),
                        placement.source.display(),
                        reason
                    );
                    pending.push(placement.clone());
                    report.skipped.push((placement.clone(), reason));
                }
            }
        }

        if pending.is_empty() {
            report.records += 1;
            dropped.push(index);
        } else {
            report.kept += 1;
            if pending.len() != record.placements.len() {
                record.placements = pending;
                line.raw = serde_json::to_string(&*record)?;
            }
        }
    }

    let remaining: Vec<&str> = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !dropped.contains(i))
        .map(|(_, line)| line.raw.as_str())
        .collect();
    let content = if remaining.is_empty() {
        String::new()
    } else {
        remaining.join("\n") + "\n"
    };
    let path = history_path(output_root);
    fs::write(&path, content).map_err(|source| HistoryError::Io { path, source })?;

    Ok(report)
}

fn restore_placement(placement: &Placement) -> Result<(), String> {
    if !placement.target.exists() {
        return Err("sorted file no longer exists".to_string());
    }
    if placement.source.exists() {
        return Err("original location is occupied".to_string());
    }
    if let Some(parent) = placement.source.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    move_file(&placement.target, &placement.source).map_err(|e| e.to_string())
}

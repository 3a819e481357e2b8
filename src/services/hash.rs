use crate::core::classifier::GroupKey;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("Failed to hash {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// BLAKE3 digest of the file's bytes.
pub fn compute_content_hash(path: &Path) -> Result<blake3::Hash, HashError> {
    let io_err = |source| HashError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(io_err)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Surviving paths in their original order
    pub kept: Vec<PathBuf>,
    pub duplicates: Vec<PathBuf>,
    /// Files that could not be read; they stay in `kept`
    pub unreadable: Vec<HashError>,
}

/// Drop every path whose content digest was already seen earlier in the
/// list. Digests are computed in parallel; the decision runs in list order.
pub fn dedup_paths(paths: Vec<PathBuf>) -> DedupOutcome {
    let digests: Vec<Result<blake3::Hash, HashError>> = paths
        .par_iter()
        .map(|path| compute_content_hash(path))
        .collect();

    let mut seen = HashSet::new();
    let mut outcome = DedupOutcome::default();
    for (path, digest) in paths.into_iter().zip(digests) {
        match digest {
            Ok(hash) if !seen.insert(hash) => outcome.duplicates.push(path),
            Ok(_) => outcome.kept.push(path),
            Err(err) => {
                outcome.unreadable.push(err);
                outcome.kept.push(path);
            }
        }
    }

    outcome
}

#[derive(Debug, Default)]
pub struct DedupReport {
    pub duplicates: BTreeMap<GroupKey, Vec<PathBuf>>,
    pub unreadable: Vec<HashError>,
}

impl DedupReport {
    pub fn duplicate_count(&self) -> usize {
        self.duplicates.values().map(Vec::len).sum()
    }
}

/// Deduplicate every group independently.
pub fn dedup_groups(
    groups: BTreeMap<GroupKey, Vec<PathBuf>>,
) -> (BTreeMap<GroupKey, Vec<PathBuf>>, DedupReport) {
    let mut kept_groups = BTreeMap::new();
    let mut report = DedupReport::default();

    for (key, paths) in groups {
        let outcome = dedup_paths(paths);
        if !outcome.duplicates.is_empty() {
            tracing::info!(
                "Found {} duplicate image(s) in group {}",
                outcome.duplicates.len(),
                key
            );
            report.duplicates.insert(key, outcome.duplicates);
        }
        report.unreadable.extend(outcome.unreadable);
        kept_groups.insert(key, outcome.kept);
    }

    (kept_groups, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::{ShapeLabel, SizeLabel};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_compute_content_hash() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.bin");
        fs::write(&file_path, b"Hello, World!").unwrap();

        let hash = compute_content_hash(&file_path).unwrap();
        assert_eq!(hash, compute_content_hash(&file_path).unwrap());
        assert_eq!(hash, blake3::hash(b"Hello, World!"));
    }

    #[test]
    fn test_large_file_hash_matches_one_shot() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("large.bin");
        let content: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&file_path, &content).unwrap();

        assert_eq!(
            compute_content_hash(&file_path).unwrap(),
            blake3::hash(&content)
        );
    }

    #[test]
    fn test_three_identical_files_keep_first() {
        let temp_dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = ["c.png", "a.png", "b.png"]
            .iter()
            .map(|name| temp_dir.path().join(name))
            .collect();
        for path in &paths {
            fs::write(path, b"same bytes").unwrap();
        }

        let outcome = dedup_paths(paths.clone());
        assert_eq!(outcome.kept, vec![paths[0].clone()]);
        assert_eq!(outcome.duplicates, vec![paths[1].clone(), paths[2].clone()]);
        assert!(outcome.unreadable.is_empty());
    }

    #[test]
    fn test_distinct_files_survive_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("1.png");
        let second = temp_dir.path().join("2.png");
        let third = temp_dir.path().join("3.png");
        fs::write(&first, b"A").unwrap();
        fs::write(&second, b"B").unwrap();
        fs::write(&third, b"A").unwrap();

        let outcome = dedup_paths(vec![first.clone(), second.clone(), third.clone()]);
        assert_eq!(outcome.kept, vec![first, second]);
        assert_eq!(outcome.duplicates, vec![third]);
    }

    #[test]
    fn test_unreadable_file_is_kept_and_reported() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone.png");

        let outcome = dedup_paths(vec![missing.clone()]);
        assert_eq!(outcome.kept, vec![missing]);
        assert_eq!(outcome.unreadable.len(), 1);
    }

    #[test]
    fn test_groups_are_deduplicated_independently() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.png");
        let b = temp_dir.path().join("b.png");
        let c = temp_dir.path().join("c.png");
        fs::write(&a, b"same").unwrap();
        fs::write(&b, b"same").unwrap();
        fs::write(&c, b"same").unwrap();

        let low = GroupKey::new(ShapeLabel::Square, SizeLabel::Low);
        let high = GroupKey::new(ShapeLabel::Square, SizeLabel::High);
        let groups = BTreeMap::from([(low, vec![a.clone(), b.clone()]), (high, vec![c.clone()])]);

        let (kept, report) = dedup_groups(groups);
        assert_eq!(kept[&low], vec![a]);
        assert_eq!(kept[&high], vec![c]);
        assert_eq!(report.duplicate_count(), 1);
        assert_eq!(report.duplicates[&low], vec![b]);
    }
}

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub const DEFAULT_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Lower-case extensions without the leading dot
    pub extensions: Vec<String>,
    /// Directories skipped entirely, e.g. an output tree inside the source
    pub exclude: Vec<PathBuf>,
}

impl ScanOptions {
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn excluding(mut self, dir: impl AsRef<Path>) -> Self {
        self.exclude.push(normalize(dir.as_ref()));
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            exclude: Vec::new(),
        }
    }
}

/// Recursively walk `root`, returning image paths in a stable order
/// (directory entries sorted by file name).
pub fn scan_directory(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::InvalidPath {
            path: format!("{} is not a directory", root.display()),
        });
    }

    let root = normalize(root);
    let mut images = Vec::new();
    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !options.exclude.iter().any(|dir| entry.path().starts_with(dir)));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if entry.file_type().is_file() && options.accepts(entry.path()) {
            images.push(entry.into_path());
        }
    }

    Ok(images)
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

use crate::core::classifier::{Classifier, ClassifyError};
use crate::core::config::SortConfig;
use crate::core::profile::{ImageProfile, ProfileError};
use crate::core::sorter::{SortedGroups, sort_groups};
use crate::services::hash::dedup_groups;
use crate::services::history::{RunRecord, append_record, history_path};
use crate::services::save::{Placement, SaveMode, save_groups};
use crate::services::scanner::{ScanOptions, scan_directory};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Folder created under the source when no output root is given.
pub const DEFAULT_OUTPUT_DIR: &str = "PicturesSort";

pub fn default_output(source: &Path) -> PathBuf {
    source.join(DEFAULT_OUTPUT_DIR)
}

/// Counts reported at the end of a run and stored in the history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub found: usize,
    pub profiled: usize,
    pub failed: usize,
    pub classified: usize,
    pub unclassified: usize,
    pub duplicates: usize,
    pub saved: usize,
    pub save_failed: usize,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: PathBuf,
    pub output: PathBuf,
    pub config: SortConfig,
    pub scan: ScanOptions,
    pub mode: SaveMode,
    pub dry_run: bool,
    pub show_progress: bool,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub placements: Vec<Placement>,
    pub history: Option<PathBuf>,
}

/// Everything known after profiling and classification.
#[derive(Debug, Default)]
pub struct Classification {
    pub found: usize,
    pub sorted: SortedGroups,
    pub failures: Vec<(PathBuf, ProfileError)>,
    pub unclassified: Vec<ClassifyError>,
}

impl Classification {
    pub fn summary(&self) -> RunSummary {
        let classified = self.sorted.total();
        RunSummary {
            found: self.found,
            profiled: classified + self.unclassified.len(),
            failed: self.failures.len(),
            classified,
            unclassified: self.unclassified.len(),
            ..RunSummary::default()
        }
    }
}

/// Run `f()`, print how long it took (with `label`), and return its result.
pub fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    println!("⏱ {} took {:.2?}", label, start.elapsed());
    result
}

fn spinner(show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

/// Walk `source` for candidate images.
pub fn discover(source: &Path, options: &ScanOptions, show_progress: bool) -> Result<Vec<PathBuf>> {
    let spinner = spinner(show_progress);
    spinner.set_message("Scanning for images…");
    let images = scan_directory(source, options)
        .with_context(|| format!("Failed to scan {}", source.display()))?;
    spinner.finish_with_message("Scan complete");
    Ok(images)
}

/// Profile every path on the rayon pool. Each image's buffers stay with
/// the worker that decoded it; results come back in input order.
pub fn profile_images(
    paths: &[PathBuf],
    config: &SortConfig,
    show_progress: bool,
) -> (Vec<ImageProfile>, Vec<(PathBuf, ProfileError)>) {
    let bar = progress_bar(paths.len(), show_progress);
    let results: Vec<Result<ImageProfile, ProfileError>> = paths
        .par_iter()
        .map(|path| {
            let result = ImageProfile::from_path(path, config);
            bar.inc(1);
            result
        })
        .collect();
    bar.finish_and_clear();

    let mut profiles = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(profile) => profiles.push(profile),
            Err(err) => {
                tracing::warn!("Load image {}: {}", path.display(), err);
                failures.push((path.clone(), err));
            }
        }
    }
    (profiles, failures)
}

/// Classify profiles and order each group by dominant color.
pub fn classify_profiles(
    profiles: Vec<ImageProfile>,
    config: &SortConfig,
) -> (SortedGroups, Vec<ClassifyError>) {
    let classifier = Classifier::from_config(config);
    let (classified, unclassified) = classifier.classify_all(profiles);
    for err in &unclassified {
        tracing::warn!("{}", err);
    }

    let sorted = sort_groups(classified);
    for key in &sorted.empty {
        tracing::info!("No image in group {}", key);
    }
    (sorted, unclassified)
}

/// Scan, profile and classify `source` without touching any file.
pub fn classify_directory(
    source: &Path,
    scan: &ScanOptions,
    config: &SortConfig,
    show_progress: bool,
) -> Result<Classification> {
    println!("▶ Scanning for images in: {}", source.display());
    let paths = discover(source, scan, show_progress)?;
    println!("Found {} image(s)", paths.len());
    if paths.is_empty() {
        return Ok(Classification::default());
    }

    println!("▶ Profiling {} image(s)…", paths.len());
    let (profiles, failures) = benchmark("profiling all images", || {
        profile_images(&paths, config, show_progress)
    });
    if !failures.is_empty() {
        println!("⚠️  {} image(s) could not be loaded", failures.len());
    }

    let (sorted, unclassified) = classify_profiles(profiles, config);
    for (key, profiles) in &sorted.groups {
        println!("   Group {} contains {} image(s)", key, profiles.len());
    }
    if !unclassified.is_empty() {
        println!("⚠️  {} image(s) can't be sorted", unclassified.len());
    }

    Ok(Classification {
        found: paths.len(),
        sorted,
        failures,
        unclassified,
    })
}

/// The full run: classify, drop duplicates, place files and log history.
pub fn run(options: &RunOptions) -> Result<RunOutcome> {
    let scan = options.scan.clone().excluding(&options.output);
    let classification =
        classify_directory(&options.source, &scan, &options.config, options.show_progress)?;
    let mut summary = classification.summary();

    if summary.found == 0 {
        println!("No images found.");
        return Ok(RunOutcome {
            summary,
            placements: Vec::new(),
            history: None,
        });
    }

    println!("▶ Removing duplicates…");
    let (groups, dedup) = benchmark("hashing all groups", || {
        dedup_groups(classification.sorted.path_lists())
    });
    for err in &dedup.unreadable {
        tracing::warn!("{}", err);
    }
    summary.duplicates = dedup.duplicate_count();
    println!("Removed {} duplicate image(s)", summary.duplicates);

    println!(
        "▶ {} images into: {}",
        match (options.dry_run, options.mode) {
            (true, _) => "Planning",
            (false, SaveMode::Copy) => "Copying",
            (false, SaveMode::Move) => "Moving",
        },
        options.output.display()
    );
    let saved = save_groups(&groups, &options.output, options.mode, options.dry_run);
    for err in &saved.failures {
        tracing::warn!("{}", err);
    }
    summary.saved = saved.placements.len();
    summary.save_failed = saved.failures.len() + saved.skipped;

    let mut history = None;
    if !options.dry_run && !saved.placements.is_empty() {
        let record = RunRecord::new(options.mode, summary.clone(), saved.placements.clone());
        match append_record(&options.output, &record) {
            Ok(()) => history = Some(history_path(&options.output)),
            Err(err) => tracing::warn!("{}", err),
        }
    }

    Ok(RunOutcome {
        summary,
        placements: saved.placements,
        history,
    })
}

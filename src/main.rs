use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use dialoguer::Confirm;
use picsort::core::config::{LowPolicy, Preset, SortConfig};
use picsort::core::histogram::describe_color;
use picsort::pipeline::{self, RunOptions, RunSummary};
use picsort::services::history::{self, RestoreSelection};
use picsort::services::save::SaveMode;
use picsort::services::scanner::ScanOptions;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "picsort",
    version,
    about = "Sort pictures by shape, size and dominant color"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Worker threads for decoding and hashing (1 = sequential)
    #[arg(short, long, value_name = "N", global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sort, deduplicate and save images into `<output>/<Shape>/<Size>/`
    Sort {
        #[command(flatten)]
        classify: ClassifyArgs,

        /// Output root (default: `<source>/PicturesSort`)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Move files instead of copying them
        #[arg(long = "move")]
        move_files: bool,

        /// Do not ask before moving files
        #[arg(short, long)]
        yes: bool,

        /// Only show where files would go
        #[arg(long)]
        dry_run: bool,
    },

    /// Show how images would be grouped and ordered, without writing
    Scan {
        #[command(flatten)]
        classify: ClassifyArgs,

        /// Output root to leave out of the scan (default: `<source>/PicturesSort`)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Work with sort history
    History {
        #[command(subcommand)]
        command: HistoryCmd,
    },
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    /// Directory to read images from (default: your pictures directory)
    #[arg(short, long, value_name = "DIR")]
    source: Option<PathBuf>,

    /// Threshold preset
    #[arg(long, value_enum, default_value_t = Preset::Blurred)]
    preset: Preset,

    /// How the Low size tier is defined
    #[arg(long, value_enum, default_value_t = LowPolicy::Complement)]
    low_policy: LowPolicy,

    /// Image extension to include, repeatable (default: jpg, jpeg, png)
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,
}

impl ClassifyArgs {
    fn source(&self) -> Result<PathBuf> {
        self.source
            .clone()
            .or_else(dirs::picture_dir)
            .context("No --source given and no pictures directory could be determined")
    }

    fn config(&self) -> SortConfig {
        SortConfig::from_preset(self.preset).with_low_policy(self.low_policy)
    }

    fn scan_options(&self) -> ScanOptions {
        if self.extensions.is_empty() {
            ScanOptions::default()
        } else {
            ScanOptions::default().with_extensions(&self.extensions)
        }
    }
}

#[derive(Subcommand, Debug)]
enum HistoryCmd {
    /// List all sort history records
    List {
        /// Output root the history lives in
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
    },

    /// Move files of `moved` records back to their original paths
    Restore {
        /// Output root the history lives in
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
        /// Restore the record at this `history list` index
        #[arg(long, conflicts_with = "all")]
        record: Option<usize>,
        /// Restore all records
        #[arg(long, conflicts_with = "record")]
        all: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(jobs) = cli.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let start = Instant::now();
    match cli.command {
        Commands::Sort {
            classify,
            output,
            move_files,
            yes,
            dry_run,
        } => {
            let source = classify.source()?;
            let output = output.unwrap_or_else(|| pipeline::default_output(&source));
            let mode = if move_files {
                SaveMode::Move
            } else {
                SaveMode::Copy
            };

            if mode == SaveMode::Move && !dry_run && !yes {
                let proceed = Confirm::new()
                    .with_prompt(format!(
                        "Move images out of {} into {}?",
                        source.display(),
                        output.display()
                    ))
                    .default(false)
                    .interact()?;
                if !proceed {
                    println!("Aborted; no files were changed.");
                    return Ok(());
                }
            }

            let options = RunOptions {
                source,
                output,
                config: classify.config(),
                scan: classify.scan_options(),
                mode,
                dry_run,
                show_progress: true,
            };
            let outcome = pipeline::run(&options)?;

            if dry_run {
                let verb = match mode {
                    SaveMode::Copy => "COPY",
                    SaveMode::Move => "MOVE",
                };
                for placement in &outcome.placements {
                    println!(
                        "   📦 [dry-run] {} {} → {}",
                        verb,
                        placement.source.display(),
                        placement.target.display()
                    );
                }
            }
            print_summary(&outcome.summary);

            if dry_run {
                println!("\n⚠️  Dry-run only; no files were changed.");
            } else if let Some(path) = outcome.history {
                println!("\n✅ Recorded sort history in {}", path.display());
            }
        }

        Commands::Scan { classify, output } => {
            let source = classify.source()?;
            let config = classify.config();
            let output = output.unwrap_or_else(|| pipeline::default_output(&source));
            let scan = classify.scan_options().excluding(&output);
            let classification = pipeline::classify_directory(&source, &scan, &config, true)?;

            for (key, profiles) in &classification.sorted.groups {
                println!("\n✨ Group {} ({} image(s)):", key, profiles.len());
                for profile in profiles {
                    println!(
                        "   ▶ {:>8} {:>11} {}",
                        describe_color(profile.dominant_color, config.metric),
                        profile.size.to_string(),
                        profile.path.display()
                    );
                }
            }
            for key in &classification.sorted.empty {
                println!("   · No image in group {}", key);
            }
            for (path, err) in &classification.failures {
                eprintln!("⚠️  Load image {}: {}", path.display(), err);
            }
            for err in &classification.unclassified {
                eprintln!("⚠️  {}", err);
            }
            print_summary(&classification.summary());
        }

        Commands::History { command } => match command {
            HistoryCmd::List { output } => {
                let lines = history::read_history(&output).with_context(|| {
                    format!("Could not read history in {}", output.display())
                })?;

                println!("🗂️  Sort History:");
                for (i, line) in lines.iter().enumerate() {
                    match &line.record {
                        Ok(rec) => println!(
                            "[{}] {}\n     action: {}\n     saved: {} of {} found ({} duplicate(s), {} failed)\n",
                            i,
                            rec.timestamp,
                            rec.action,
                            rec.summary.saved,
                            rec.summary.found,
                            rec.summary.duplicates,
                            rec.summary.failed + rec.summary.unclassified + rec.summary.save_failed
                        ),
                        Err(err) => eprintln!("⚠️  Skipping malformed entry {}: {}", i, err),
                    }
                }
            }

            HistoryCmd::Restore {
                output,
                record,
                all,
            } => {
                let selection = match (all, record) {
                    (true, _) => RestoreSelection::All,
                    (false, Some(index)) => RestoreSelection::Index(index),
                    (false, None) => RestoreSelection::Last,
                };
                let report = history::restore(&output, selection)?;

                for placement in &report.restored {
                    println!(
                        "🔄 Restored {} → {}",
                        placement.target.display(),
                        placement.source.display()
                    );
                }
                for (placement, reason) in &report.skipped {
                    eprintln!(
                        "⚠️  Skipped {}: {}",
                        placement.target.display(),
                        reason
                    );
                }
                println!("🧹 Updated history, removed {} record(s)", report.records);
                if report.kept > 0 {
                    println!(
                        "⚠️  Kept {} record(s) with files still to restore",
                        report.kept
                    );
                }
            }
        },
    }

    println!("⏱ Time: {:.2?}", start.elapsed());
    Ok(())
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("picsort={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(summary: &RunSummary) {
    println!("\n📊 Summary");
    println!("   found:        {}", summary.found);
    println!("   load failed:  {}", summary.failed);
    println!("   classified:   {}", summary.classified);
    println!("   unclassified: {}", summary.unclassified);
    println!("   duplicates:   {}", summary.duplicates);
    println!("   saved:        {}", summary.saved);
    println!("   save failed:  {}", summary.save_failed);
}

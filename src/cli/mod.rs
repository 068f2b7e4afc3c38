//! # CLI Module
//!
//! Command-line interface for the media organizer.
//!
//! ## Usage
//! ```bash
//! # Copy a camera dump into a dated tree
//! media-organize organize ~/Camera ~/Pictures/Sorted
//!
//! # Move instead, byte-check collisions, then review them
//! media-organize organize ~/Camera ~/Pictures/Sorted --move --verify --review
//!
//! # JSON output
//! media-organize organize ~/Camera ~/Pictures/Sorted --output json
//!
//! # Show what would happen to individual files
//! media-organize inspect ~/Camera/IMG_0001.JPG ~/Camera/clip.mp4
//! ```

mod review;

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use media_organizer::config::OrganizerConfig;
use media_organizer::core::date::DateResolver;
use media_organizer::core::metadata::{ImageMetadataReader, KamadakExifReader};
use media_organizer::core::pipeline::{spawn_worker, BatchResult, FailureRecord, PipelineBuilder};
use media_organizer::core::probe::{FfprobeProbe, VideoProbe};
use media_organizer::core::reconcile::Reconciler;
use media_organizer::core::scanner::MediaFilter;
use media_organizer::core::transfer::{derive_destination, OperationMode};
use media_organizer::core::validator::MediaValidator;
use media_organizer::error::{OrganizerError, Result};
use media_organizer::events::{Event, EventChannel};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often the worker's event queue is drained
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Records listed per section in pretty output
const DISPLAY_LIMIT: usize = 10;

/// Media Organizer - sort photos and videos into YYYY/MM/DD folders
#[derive(Parser, Debug)]
#[command(name = "media-organize")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Organize a source tree into a dated destination tree
    Organize {
        /// Directory to organize
        source: PathBuf,

        /// Root of the YYYY/MM/DD tree
        destination: PathBuf,

        /// Move files instead of copying them
        #[arg(long = "move")]
        move_files: bool,

        /// Byte-compare files whose destination already exists
        #[arg(long)]
        verify: bool,

        /// Directory for report files
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Do not write report files
        #[arg(long, conflicts_with = "report_dir")]
        no_reports: bool,

        /// JSON settings file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Review duplicates interactively when the batch finishes
        #[arg(long)]
        review: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show kind, validity and resolved date for individual files
    Inspect {
        /// Files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// JSON settings file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (destination paths only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Organize {
            source,
            destination,
            move_files,
            verify,
            report_dir,
            no_reports,
            config,
            output,
            review,
            verbose,
        } => {
            init_logging(verbose);
            let mut settings = load_config(config.as_deref())?;
            if move_files {
                settings.mode = OperationMode::Move;
            }
            if verify {
                settings.verify_identity = true;
            }
            if report_dir.is_some() {
                settings.report_dir = report_dir;
            }
            run_organize(
                source,
                destination,
                settings,
                !no_reports,
                output,
                review,
                verbose,
            )
        }
        Commands::Inspect {
            files,
            config,
            verbose,
        } => {
            init_logging(verbose);
            let settings = load_config(config.as_deref())?;
            run_inspect(&files, &settings)
        }
    }
}

fn init_logging(verbose: bool) {
    media_organizer::init_tracing(if verbose { "debug" } else { "warn" });
}

fn load_config(path: Option<&Path>) -> Result<OrganizerConfig> {
    match path {
        Some(path) => OrganizerConfig::load(path),
        None => Ok(OrganizerConfig::default()),
    }
}

fn run_organize(
    source: PathBuf,
    destination: PathBuf,
    settings: OrganizerConfig,
    write_reports: bool,
    output: OutputFormat,
    review: bool,
    verbose: bool,
) -> Result<()> {
    settings.validate()?;
    let term = Term::stderr();
    let pretty = matches!(output, OutputFormat::Pretty);

    // Print header
    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Media Organizer").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line(&format!(
            "  {} {}  {}  {}",
            style(settings.mode).yellow(),
            source.display(),
            style("-->").dim(),
            destination.display()
        ))
        .ok();
        if !FfprobeProbe::new(settings.ffprobe.clone()).is_available() {
            term.write_line(&format!(
                "  {} {} not found; videos will be reported as invalid",
                style("!").yellow().bold(),
                settings.ffprobe.display()
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    let mut builder = PipelineBuilder::from_config(&settings)
        .source(&source)
        .destination(&destination);
    if !write_reports {
        builder = builder.report_dir(None);
    }
    let pipeline = builder.build();

    // Set up event handling
    let (sender, receiver) = EventChannel::new();
    let worker = spawn_worker(pipeline, sender)?;

    // Progress bar for pretty output
    let progress = if pretty {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    // Drain the queue until the worker reports how it ended
    let outcome = loop {
        let finished = worker.is_finished();
        let mut terminal = None;
        for event in receiver.drain() {
            match event {
                Event::Progress(p) => {
                    if let Some(ref pb) = progress {
                        pb.set_length(p.total as u64);
                        pb.set_position(p.processed as u64);
                        pb.set_message(p.status);
                    }
                }
                Event::Completed(result) => terminal = Some(Ok(result)),
                Event::Failed { message } => terminal = Some(Err(OrganizerError::Worker(message))),
            }
        }
        if let Some(outcome) = terminal {
            break outcome;
        }
        if finished {
            break Err(OrganizerError::Worker(
                "worker stopped without reporting a result".to_string(),
            ));
        }
        thread::sleep(POLL_INTERVAL);
    };

    if let Some(ref pb) = progress {
        pb.finish_and_clear();
    }
    let _ = worker.join();
    let result = outcome?;

    // Output results
    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &result, verbose),
        OutputFormat::Json => print_json_results(&result)?,
        OutputFormat::Minimal => print_minimal_results(&result),
    }

    if review && result.duplicate_count() > 0 {
        let reader: Arc<dyn ImageMetadataReader> = Arc::new(KamadakExifReader);
        let summary = review::run(&term, Reconciler::from_result(&result), reader)?;
        if pretty {
            term.write_line(&format!(
                "  {} replaced, {} deleted, {} left unresolved",
                style(summary.replaced).cyan(),
                style(summary.deleted).cyan(),
                style(summary.remaining).yellow()
            ))
            .ok();
        }
    }

    Ok(())
}

fn print_pretty_results(term: &Term, result: &BatchResult, verbose: bool) {
    term.write_line("").ok();
    if result.cancelled() {
        term.write_line(&format!(
            "{} Batch Cancelled ({} of {} files handled)",
            style("!").yellow().bold(),
            result.processed(),
            result.total()
        ))
        .ok();
    } else {
        term.write_line(&format!("{} Batch Complete", style("✓").green().bold()))
            .ok();
    }
    term.write_line("").ok();

    // Summary
    term.write_line(&format!(
        "  {} files found, processed in {:.1}s",
        style(result.total()).cyan(),
        result.duration_ms() as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} organized ({} images, {} videos)",
        style(result.success_count()).green(),
        result.image_count(),
        result.video_count()
    ))
    .ok();
    term.write_line(&format!(
        "  {} duplicates",
        style(result.duplicate_count()).yellow()
    ))
    .ok();
    term.write_line(&format!(
        "  {} invalid files",
        style(result.invalid_count()).red()
    ))
    .ok();
    term.write_line(&format!("  {} errors", style(result.error_count()).red()))
        .ok();
    if !result.scan_errors().is_empty() {
        term.write_line(&format!(
            "  {} directories could not be read",
            style(result.scan_errors().len()).dim()
        ))
        .ok();
    }

    print_failures(term, "Errors:", result.errors(), result);
    print_failures(term, "Invalid files:", result.invalid(), result);

    if !result.duplicates().is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Duplicates:").bold().underlined()))
            .ok();
        for record in result.duplicates().iter().take(DISPLAY_LIMIT) {
            term.write_line(&format!(
                "  {}  {}  {} {}",
                display_path(&record.source),
                style("-->").dim(),
                display_path(&record.existing),
                style(format!("[{}]", record.verdict)).dim()
            ))
            .ok();
        }
        print_overflow(term, result.duplicates().len(), result);
    }

    if verbose && !result.scan_errors().is_empty() {
        term.write_line("").ok();
        for error in result.scan_errors() {
            term.write_line(&format!("  {} {}", style("skipped").dim(), error))
                .ok();
        }
    }

    if !result.reports().is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Reports:").bold())).ok();
        for report in result.reports() {
            term.write_line(&format!("  {}", report.display())).ok();
        }
    }

    term.write_line("").ok();
    if result.duplicate_count() > 0 {
        term.write_line(&format!(
            "{}",
            style("Existing files were never overwritten. Use --review to resolve duplicates.")
                .dim()
        ))
        .ok();
    }
}

fn print_failures(term: &Term, title: &str, records: &[FailureRecord], result: &BatchResult) {
    if records.is_empty() {
        return;
    }
    term.write_line("").ok();
    term.write_line(&format!("{}", style(title).bold().underlined()))
        .ok();
    for record in records.iter().take(DISPLAY_LIMIT) {
        term.write_line(&format!(
            "  {} {}",
            style("✗").red(),
            style(failure_text(record)).dim()
        ))
        .ok();
    }
    print_overflow(term, records.len(), result);
}

fn print_overflow(term: &Term, shown_of: usize, result: &BatchResult) {
    if shown_of <= DISPLAY_LIMIT {
        return;
    }
    let hint = if result.reports().is_empty() {
        String::new()
    } else {
        " (see reports below)".to_string()
    };
    term.write_line(&format!(
        "  {}",
        style(format!("... and {} more{}", shown_of - DISPLAY_LIMIT, hint)).dim()
    ))
    .ok();
}

fn print_json_results(result: &BatchResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

fn print_minimal_results(result: &BatchResult) {
    for record in result.successes() {
        println!("{}", record.destination.display());
    }
}

fn run_inspect(files: &[PathBuf], settings: &OrganizerConfig) -> Result<()> {
    let term = Term::stdout();
    let filter = MediaFilter::new()
        .with_image_extensions(&settings.image_extensions)
        .with_video_extensions(&settings.video_extensions);
    let probe: Arc<dyn VideoProbe> = Arc::new(FfprobeProbe::new(settings.ffprobe.clone()));
    let validator = MediaValidator::new(probe.clone());
    let resolver = DateResolver::new(Arc::new(KamadakExifReader), probe);

    for path in files {
        term.write_line(&format!("{}", style(path.display()).bold()))
            .ok();

        let Some(kind) = filter.classify(path) else {
            term.write_line(&format!(
                "  {}",
                style("not a recognized media file").dim()
            ))
            .ok();
            continue;
        };
        term.write_line(&format!("  kind:        {}", kind)).ok();

        match validator.validate(path, kind) {
            Ok(()) => {
                term.write_line(&format!("  valid:       {}", style("yes").green()))
                    .ok();
            }
            Err(e) => {
                term.write_line(&format!("  valid:       {} ({})", style("no").red(), e))
                    .ok();
            }
        }

        match resolver.resolve(path, kind) {
            Ok(date) => {
                term.write_line(&format!(
                    "  date:        {} ({})",
                    date.value.format("%Y-%m-%d %H:%M:%S"),
                    date.source
                ))
                .ok();
                if let Some(name) = path.file_name() {
                    term.write_line(&format!(
                        "  destination: {}",
                        derive_destination(Path::new(""), &date, name).display()
                    ))
                    .ok();
                }
            }
            Err(e) => {
                term.write_line(&format!("  date:        {} ({})", style("none").red(), e))
                    .ok();
            }
        }
    }

    Ok(())
}

/// `path: reason`, since some reasons (a missing ffprobe) name no file
fn failure_text(record: &FailureRecord) -> String {
    format!("{}: {}", display_path(&record.source), record.reason)
}

/// Shorten paths under the home directory to `~/...`
fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(&home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}

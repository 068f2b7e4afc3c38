//! Pipeline execution implementation.

use super::result::{BatchAccumulator, BatchResult};
use crate::config::OrganizerConfig;
use crate::core::date::DateResolver;
use crate::core::metadata::{ImageMetadataReader, KamadakExifReader};
use crate::core::probe::{FfprobeProbe, VideoProbe};
use crate::core::reporter::ReportWriter;
use crate::core::scanner::{MediaFile, ScanConfig, WalkDirScanner};
use crate::core::transfer::{
    transfer_with_chunk, OperationMode, TransferOutcome, DEFAULT_CHUNK_SIZE,
};
use crate::core::validator::MediaValidator;
use crate::error::{OrganizerError, ScanError};
use crate::events::{BatchProgress, Event, EventSender};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Status carried by the first progress update of every batch
pub const STARTING_STATUS: &str = "Starting processing...";

const WORKER_THREAD_NAME: &str = "media-organizer-batch";

/// Shared flag for stopping a batch between files
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the file in flight still completes
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory to organize
    pub source: PathBuf,
    /// Root of the dated tree
    pub destination: PathBuf,
    /// Copy or move
    pub mode: OperationMode,
    /// Byte-compare colliding files
    pub verify_identity: bool,
    /// Scanner configuration
    pub scan_config: ScanConfig,
    /// Report output (None = no reports)
    pub report_dir: Option<PathBuf>,
    /// Emit progress every N files
    pub progress_every: usize,
    /// Chunk size for byte comparison
    pub compare_chunk_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            mode: OperationMode::Copy,
            verify_identity: false,
            scan_config: ScanConfig::default(),
            report_dir: None,
            progress_every: 10,
            compare_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    metadata_reader: Option<Arc<dyn ImageMetadataReader>>,
    video_probe: Option<Arc<dyn VideoProbe>>,
    cancellation: CancellationToken,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            metadata_reader: None,
            video_probe: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Start from file/CLI settings
    pub fn from_config(config: &OrganizerConfig) -> Self {
        Self::new()
            .mode(config.mode)
            .verify_identity(config.verify_identity)
            .scan_config(ScanConfig {
                follow_symlinks: config.follow_symlinks,
                include_hidden: config.include_hidden,
                max_depth: None,
                image_extensions: Some(config.image_extensions.clone()),
                video_extensions: Some(config.video_extensions.clone()),
            })
            .report_dir(Some(config.resolved_report_dir()))
            .progress_every(config.progress_every)
            .compare_chunk_size(config.compare_chunk_size)
            .video_probe(Arc::new(FfprobeProbe::new(config.ffprobe.clone())))
    }

    /// Directory to organize
    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source = path.into();
        self
    }

    /// Root of the dated tree
    pub fn destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.destination = path.into();
        self
    }

    /// Copy or move
    pub fn mode(mut self, mode: OperationMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Byte-compare colliding files
    pub fn verify_identity(mut self, verify: bool) -> Self {
        self.config.verify_identity = verify;
        self
    }

    /// Set scanner configuration
    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.config.scan_config = config;
        self
    }

    /// Include hidden files
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.scan_config.include_hidden = include;
        self
    }

    /// Where reports go; None disables them
    pub fn report_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.report_dir = dir;
        self
    }

    /// Emit progress every N files (minimum 1)
    pub fn progress_every(mut self, every: usize) -> Self {
        self.config.progress_every = every.max(1);
        self
    }

    /// Chunk size for byte comparison
    pub fn compare_chunk_size(mut self, size: usize) -> Self {
        self.config.compare_chunk_size = size.max(1);
        self
    }

    /// Source of EXIF tags (default: kamadak-exif)
    pub fn metadata_reader(mut self, reader: Arc<dyn ImageMetadataReader>) -> Self {
        self.metadata_reader = Some(reader);
        self
    }

    /// Video prober (default: `ffprobe` on PATH)
    pub fn video_probe(mut self, probe: Arc<dyn VideoProbe>) -> Self {
        self.video_probe = Some(probe);
        self
    }

    /// Share a cancellation token with the caller
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        let metadata_reader = self
            .metadata_reader
            .unwrap_or_else(|| Arc::new(KamadakExifReader));
        let video_probe = self
            .video_probe
            .unwrap_or_else(|| Arc::new(FfprobeProbe::default()));

        Pipeline {
            config: self.config,
            validator: MediaValidator::new(video_probe.clone()),
            resolver: DateResolver::new(metadata_reader, video_probe),
            cancellation: self.cancellation,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The media organizing pipeline
pub struct Pipeline {
    config: PipelineConfig,
    validator: MediaValidator,
    resolver: DateResolver,
    cancellation: CancellationToken,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Token that stops this pipeline between files
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Run the pipeline without progress reporting
    pub fn run(&self) -> Result<BatchResult, OrganizerError> {
        self.run_with_progress(|_| {})
    }

    /// Run the pipeline, pushing progress events to `events`
    pub fn run_with_events(&self, events: &EventSender) -> Result<BatchResult, OrganizerError> {
        self.run_with_progress(|progress| events.send(Event::Progress(progress)))
    }

    /// Run the pipeline, calling `on_progress` at start, every N files and on
    /// the last file.
    ///
    /// Only batch-level problems are returned as errors; every per-file
    /// failure ends up in the result.
    pub fn run_with_progress<F>(&self, mut on_progress: F) -> Result<BatchResult, OrganizerError>
    where
        F: FnMut(BatchProgress),
    {
        let start_time = Instant::now();
        let source = &self.config.source;
        let destination = &self.config.destination;

        if !source.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: source.clone(),
            }
            .into());
        }
        preflight_destination(destination)?;

        info!(
            source = %source.display(),
            destination = %destination.display(),
            mode = %self.config.mode,
            "Starting batch"
        );

        let scanner = WalkDirScanner::new(self.config.scan_config.clone());
        let scan = scanner.scan(source)?;
        let files = exclude_destination(scan.files, destination);
        let total = files.len();

        let mut acc = BatchAccumulator::new(source, destination, self.config.mode);
        acc.set_total(total);
        for error in &scan.errors {
            acc.scan_error(error.to_string());
        }

        on_progress(BatchProgress::new(0, total, STARTING_STATUS));

        for (i, file) in files.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                info!(processed = i, total, "Batch cancelled");
                acc.cancel();
                break;
            }

            let outcome = self.process_file(file);
            acc.record(&file.path, file.kind, outcome);

            let idx = i + 1;
            if idx % self.config.progress_every == 0 || idx == total {
                on_progress(BatchProgress::new(
                    idx,
                    total,
                    format!("Processing {}/{}: {}", idx, total, display_name(&file.path)),
                ));
            }
        }

        if let Some(dir) = &self.config.report_dir {
            for path in write_reports(&ReportWriter::new(dir), acc.peek()) {
                acc.add_report(path);
            }
        }

        let result = acc.finish(start_time.elapsed().as_millis() as u64);
        info!(
            organized = result.success_count(),
            duplicates = result.duplicate_count(),
            invalid = result.invalid_count(),
            errors = result.error_count(),
            duration_ms = result.duration_ms(),
            "Batch complete"
        );
        Ok(result)
    }

    /// Validate, date and transfer a single file
    fn process_file(&self, file: &MediaFile) -> TransferOutcome {
        if let Err(e) = self.validator.validate(&file.path, file.kind) {
            return TransferOutcome::Invalid {
                reason: e.to_string(),
            };
        }

        let date = match self.resolver.resolve(&file.path, file.kind) {
            Ok(date) => date,
            Err(e) => {
                warn!("{}", e);
                return TransferOutcome::Error {
                    reason: e.to_string(),
                    destination: None,
                };
            }
        };

        transfer_with_chunk(
            &file.path,
            &self.config.destination,
            &date,
            self.config.mode,
            self.config.verify_identity,
            self.config.compare_chunk_size,
        )
    }
}

/// Run `pipeline` on a dedicated thread.
///
/// Progress is pushed to `sender`, followed by exactly one `Completed` or
/// `Failed` event.
pub fn spawn_worker(pipeline: Pipeline, sender: EventSender) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || match pipeline.run_with_events(&sender) {
            Ok(result) => sender.send(Event::Completed(Box::new(result))),
            Err(e) => {
                warn!("Batch failed: {}", e);
                sender.send(Event::Failed {
                    message: e.to_string(),
                })
            }
        })
}

/// Create the destination root and prove a file can be written inside it
fn preflight_destination(destination: &Path) -> Result<(), OrganizerError> {
    let not_writable = |source| OrganizerError::DestinationNotWritable {
        path: destination.to_path_buf(),
        source,
    };

    fs::create_dir_all(destination).map_err(not_writable)?;
    let probe = tempfile::Builder::new()
        .prefix(".media-organizer-")
        .tempfile_in(destination)
        .map_err(not_writable)?;
    probe.close().map_err(not_writable)
}

/// Drop files that already live under the destination root.
///
/// Both sides are canonicalized so a destination spelled with `..` or
/// reached through a symlink is still recognised.
fn exclude_destination(files: Vec<MediaFile>, destination: &Path) -> Vec<MediaFile> {
    let destination = match fs::canonicalize(destination) {
        Ok(path) => path,
        Err(e) => {
            warn!(path = %destination.display(), "Could not resolve destination: {}", e);
            return files;
        }
    };
    files
        .into_iter()
        .filter(|file| {
            let resolved = fs::canonicalize(&file.path).unwrap_or_else(|_| file.path.clone());
            let inside = resolved.starts_with(&destination);
            if inside {
                debug!(path = %file.path.display(), "Skipping file inside destination");
            }
            !inside
        })
        .collect()
}

/// Write every non-empty report, logging failures
fn write_reports(writer: &ReportWriter, result: &BatchResult) -> Vec<PathBuf> {
    let mut written = Vec::new();
    let mut keep = |report: Result<PathBuf, _>| match report {
        Ok(path) => written.push(path),
        Err(e) => warn!("{}", e),
    };

    if !result.invalid().is_empty() {
        keep(writer.write_invalid(result.invalid()));
    }
    if !result.successes().is_empty() {
        keep(writer.write_success(result.successes()));
    }
    if !result.duplicates().is_empty() {
        keep(writer.write_duplicates(result.duplicates()));
    }
    written
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

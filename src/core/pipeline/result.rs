//! Batch outcome aggregation.

use crate::core::scanner::MediaKind;
use crate::core::transfer::{IdentityVerdict, OperationMode, TransferOutcome};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A file that reached its dated destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: MediaKind,
}

/// A file whose destination was already occupied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateRecord {
    pub source: PathBuf,
    pub existing: PathBuf,
    pub verdict: IdentityVerdict,
}

/// A file that was rejected or failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub source: PathBuf,
    pub reason: String,
}

/// Aggregate result of one batch.
///
/// Lists keep scan order. Built by the pipeline and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    id: Uuid,
    source_root: PathBuf,
    destination_root: PathBuf,
    mode: OperationMode,
    total: usize,
    successes: Vec<SuccessRecord>,
    duplicates: Vec<DuplicateRecord>,
    invalid: Vec<FailureRecord>,
    errors: Vec<FailureRecord>,
    scan_errors: Vec<String>,
    reports: Vec<PathBuf>,
    cancelled: bool,
    duration_ms: u64,
}

impl BatchResult {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    /// Files found by the scan
    pub fn total(&self) -> usize {
        self.total
    }

    /// Files that received an outcome
    pub fn processed(&self) -> usize {
        self.successes.len() + self.duplicates.len() + self.invalid.len() + self.errors.len()
    }

    pub fn successes(&self) -> &[SuccessRecord] {
        &self.successes
    }

    pub fn duplicates(&self) -> &[DuplicateRecord] {
        &self.duplicates
    }

    pub fn invalid(&self) -> &[FailureRecord] {
        &self.invalid
    }

    pub fn errors(&self) -> &[FailureRecord] {
        &self.errors
    }

    /// Directories the scan could not read
    pub fn scan_errors(&self) -> &[String] {
        &self.scan_errors
    }

    /// Report files written for this batch
    pub fn reports(&self) -> &[PathBuf] {
        &self.reports
    }

    /// True if the batch stopped before every file was handled
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn image_count(&self) -> usize {
        self.count_kind(MediaKind::Image)
    }

    pub fn video_count(&self) -> usize {
        self.count_kind(MediaKind::Video)
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    fn count_kind(&self, kind: MediaKind) -> usize {
        self.successes.iter().filter(|s| s.kind == kind).count()
    }
}

/// Mutable builder the pipeline fills file by file
pub(crate) struct BatchAccumulator {
    result: BatchResult,
}

impl BatchAccumulator {
    pub(crate) fn new(source_root: &Path, destination_root: &Path, mode: OperationMode) -> Self {
        Self {
            result: BatchResult {
                id: Uuid::new_v4(),
                source_root: source_root.to_path_buf(),
                destination_root: destination_root.to_path_buf(),
                mode,
                total: 0,
                successes: Vec::new(),
                duplicates: Vec::new(),
                invalid: Vec::new(),
                errors: Vec::new(),
                scan_errors: Vec::new(),
                reports: Vec::new(),
                cancelled: false,
                duration_ms: 0,
            },
        }
    }

    pub(crate) fn set_total(&mut self, total: usize) {
        self.result.total = total;
    }

    pub(crate) fn scan_error(&mut self, message: String) {
        self.result.scan_errors.push(message);
    }

    /// File into the bucket matching its outcome
    pub(crate) fn record(&mut self, source: &Path, kind: MediaKind, outcome: TransferOutcome) {
        let source = source.to_path_buf();
        match outcome {
            TransferOutcome::Copied { destination } | TransferOutcome::Moved { destination } => {
                self.result.successes.push(SuccessRecord {
                    source,
                    destination,
                    kind,
                })
            }
            TransferOutcome::Duplicate { existing, verdict } => {
                self.result.duplicates.push(DuplicateRecord {
                    source,
                    existing,
                    verdict,
                })
            }
            TransferOutcome::Invalid { reason } => {
                self.result.invalid.push(FailureRecord { source, reason })
            }
            TransferOutcome::Error { reason, .. } => {
                self.result.errors.push(FailureRecord { source, reason })
            }
        }
    }

    pub(crate) fn cancel(&mut self) {
        self.result.cancelled = true;
    }

    pub(crate) fn add_report(&mut self, path: PathBuf) {
        self.result.reports.push(path);
    }

    /// A view of the result so far, for report writers
    pub(crate) fn peek(&self) -> &BatchResult {
        &self.result
    }

    pub(crate) fn finish(mut self, duration_ms: u64) -> BatchResult {
        self.result.duration_ms = duration_ms;
        self.result
    }
}

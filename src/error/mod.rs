//! # Error Module
//!
//! Error types for the media organizer.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-file errors are data** - the batch turns them into report lines
//! - **Batch-level errors stop early** - an unusable destination fails once, not per file

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Date resolution error: {0}")]
    Date(#[from] DateError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Report generation error: {0}")]
    Report(#[from] ReportError),

    #[error("Destination {path} is not writable: {source}")]
    DestinationNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Batch failed: {0}")]
    Worker(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while walking the source tree
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the external video probe
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("{tool} is not installed or not in PATH")]
    ToolMissing { tool: String },

    #[error("No video stream found in {path}")]
    NoVideoStream { path: PathBuf },

    #[error("Invalid video file {path}: {reason}")]
    Rejected { path: PathBuf, reason: String },

    #[error("Could not parse probe output for {path}: {reason}")]
    Output { path: PathBuf, reason: String },

    #[error("Failed to run probe on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reasons a file is rejected before any date or transfer work
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

impl ValidationError {
    /// True when the probe tool itself is unavailable, as opposed to a bad file
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, ValidationError::Probe(ProbeError::ToolMissing { .. }))
    }
}

/// Errors while resolving a file's date
#[derive(Error, Debug)]
pub enum DateError {
    #[error("Could not extract date from {path}: no metadata date and modified time unreadable ({source})")]
    Exhausted {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors during copy or move
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Permission denied: {path}: {source}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy to {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {path}: {source}")]
    Move {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy verification failed for {path}: source {expected} bytes, destination {actual} bytes")]
    Verification {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Copied to {destination} but could not remove source {path}: {source}")]
    SourceNotRemoved {
        path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} already is its own destination")]
    AlreadyInPlace { path: PathBuf },

    #[error("Source path has no file name: {path}")]
    MissingFileName { path: PathBuf },
}

impl TransferError {
    /// Classify an I/O failure, keeping permission problems distinct
    pub(crate) fn from_io(
        path: PathBuf,
        source: std::io::Error,
        other: impl FnOnce(PathBuf, std::io::Error) -> TransferError,
    ) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            TransferError::PermissionDenied { path, source }
        } else {
            other(path, source)
        }
    }
}

/// Errors from reconciliation actions
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Failed to replace {existing} with {source_path}: {source}")]
    Replace {
        source_path: PathBuf,
        existing: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to touch {path}: source and existing are the same file")]
    SameFile { path: PathBuf },

    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur during report generation
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to create report directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, OrganizerError>;

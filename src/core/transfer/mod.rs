//! # Transfer Module
//!
//! Places one source file under the dated destination tree.
//!
//! ## Rules
//! - An occupied destination is a duplicate and is never written to.
//! - A source that already is its own destination is an error, never a
//!   duplicate of itself.
//! - Copies carry the source's access and modification times.
//! - A move removes the source only after the destination is confirmed:
//!   either the rename succeeded, or a copy was made and its size verified.
//! - Failures become `TransferOutcome::Error`; nothing is raised to the caller.

mod identity;
mod path;

pub use identity::{
    files_identical, files_identical_with_chunk, same_file, IdentityVerdict, DEFAULT_CHUNK_SIZE,
};
pub use path::derive_destination;

use crate::core::date::ResolvedDate;
use crate::error::TransferError;
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Operation mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Copy files to destination (keep originals)
    #[default]
    Copy,
    /// Move files to destination
    Move,
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationMode::Copy => write!(f, "copy"),
            OperationMode::Move => write!(f, "move"),
        }
    }
}

/// What happened to a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    Copied {
        destination: PathBuf,
    },
    Moved {
        destination: PathBuf,
    },
    /// Destination already occupied; nothing was written
    Duplicate {
        existing: PathBuf,
        verdict: IdentityVerdict,
    },
    /// Rejected before transfer
    Invalid {
        reason: String,
    },
    Error {
        reason: String,
        destination: Option<PathBuf>,
    },
}

impl TransferOutcome {
    /// Destination written or collided with, if any
    pub fn destination(&self) -> Option<&Path> {
        match self {
            TransferOutcome::Copied { destination } | TransferOutcome::Moved { destination } => {
                Some(destination)
            }
            TransferOutcome::Duplicate { existing, .. } => Some(existing),
            TransferOutcome::Error { destination, .. } => destination.as_deref(),
            TransferOutcome::Invalid { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            TransferOutcome::Copied { .. } | TransferOutcome::Moved { .. }
        )
    }
}

/// Transfer `source` into `dest_root` using the default comparison chunk
pub fn transfer(
    source: &Path,
    dest_root: &Path,
    date: &ResolvedDate,
    mode: OperationMode,
    verify_identity: bool,
) -> TransferOutcome {
    transfer_with_chunk(source, dest_root, date, mode, verify_identity, DEFAULT_CHUNK_SIZE)
}

/// Transfer `source` into `dest_root`, comparing collisions in `chunk_size` blocks
pub fn transfer_with_chunk(
    source: &Path,
    dest_root: &Path,
    date: &ResolvedDate,
    mode: OperationMode,
    verify_identity: bool,
    chunk_size: usize,
) -> TransferOutcome {
    let Some(file_name) = source.file_name() else {
        let err = TransferError::MissingFileName {
            path: source.to_path_buf(),
        };
        return TransferOutcome::Error {
            reason: err.to_string(),
            destination: None,
        };
    };

    let destination = derive_destination(dest_root, date, file_name);

    if destination.exists() {
        if same_file(source, &destination) {
            let err = TransferError::AlreadyInPlace {
                path: source.to_path_buf(),
            };
            warn!("{}", err);
            return TransferOutcome::Error {
                reason: err.to_string(),
                destination: Some(destination),
            };
        }

        let verdict = if verify_identity {
            IdentityVerdict::from(files_identical_with_chunk(source, &destination, chunk_size))
        } else {
            IdentityVerdict::Unknown
        };
        debug!(
            source = %source.display(),
            existing = %destination.display(),
            %verdict,
            "Destination occupied"
        );
        return TransferOutcome::Duplicate {
            existing: destination,
            verdict,
        };
    }

    match place(source, &destination, mode) {
        Ok(()) => match mode {
            OperationMode::Copy => TransferOutcome::Copied { destination },
            OperationMode::Move => TransferOutcome::Moved { destination },
        },
        Err(e) => {
            error!("{}", e);
            TransferOutcome::Error {
                reason: e.to_string(),
                destination: Some(destination),
            }
        }
    }
}

fn place(source: &Path, destination: &Path, mode: OperationMode) -> Result<(), TransferError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            TransferError::from_io(parent.to_path_buf(), e, |path, source| {
                TransferError::CreateDirectory { path, source }
            })
        })?;
    }

    match mode {
        OperationMode::Copy => copy_new(source, destination),
        OperationMode::Move => move_file(source, destination),
    }
}

/// Copy to a fresh destination, removing any partial file on failure
fn copy_new(source: &Path, destination: &Path) -> Result<(), TransferError> {
    copy_with_times(source, destination).map(|_| ()).map_err(|e| {
        let _ = fs::remove_file(destination);
        TransferError::from_io(destination.to_path_buf(), e, |path, source| {
            TransferError::Copy { path, source }
        })
    })
}

fn move_file(source: &Path, destination: &Path) -> Result<(), TransferError> {
    let rename_err = match fs::rename(source, destination) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    if rename_err.kind() == io::ErrorKind::PermissionDenied {
        return Err(TransferError::PermissionDenied {
            path: source.to_path_buf(),
            source: rename_err,
        });
    }

    // rename fails across filesystems, fall back to copy+delete
    debug!(source = %source.display(), "Rename failed ({}), copying instead", rename_err);
    let expected = fs::metadata(source)
        .map_err(|e| {
            TransferError::from_io(source.to_path_buf(), e, |path, source| {
                TransferError::Move { path, source }
            })
        })?
        .len();

    copy_new(source, destination)?;

    let actual = fs::metadata(destination).map(|m| m.len()).unwrap_or(0);
    if actual != expected {
        // Copy was incomplete, don't delete source
        let _ = fs::remove_file(destination);
        return Err(TransferError::Verification {
            path: destination.to_path_buf(),
            expected,
            actual,
        });
    }

    fs::remove_file(source).map_err(|e| {
        warn!(source = %source.display(), "Copied but source could not be removed");
        TransferError::SourceNotRemoved {
            path: source.to_path_buf(),
            destination: destination.to_path_buf(),
            source: e,
        }
    })
}

/// Copy file contents and permissions, then apply the source's access and
/// modification times. Overwrites `destination` if present.
pub fn copy_with_times(source: &Path, destination: &Path) -> io::Result<u64> {
    let metadata = fs::metadata(source)?;
    let bytes = fs::copy(source, destination)?;
    filetime::set_file_times(
        destination,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )?;
    Ok(bytes)
}

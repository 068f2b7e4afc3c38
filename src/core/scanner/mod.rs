//! # Scanner Module
//!
//! Discovers photo and video files in a directory tree.
//!
//! ## Supported Formats
//! - Images: .jpg .jpeg .png .heic .webp .gif .bmp .tiff .tif
//! - Videos: .mp4 .mov .avi .mkv .wmv .flv .webm .m4v .3gp
//!
//! Extension matching is case-insensitive. The walk is lazy and depth-first;
//! unreadable subdirectories are logged and skipped.
//!
//! ## Example
//! ```rust,ignore
//! use media_organizer::core::scanner::{ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! for file in scanner.files(Path::new("/Users/me/Camera")) {
//!     println!("{:?} {}", file.kind, file.path.display());
//! }
//! ```

mod filter;
mod walker;

pub use filter::MediaFilter;
pub use walker::{MediaFiles, ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default image extensions
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "webp", "gif", "bmp", "tiff", "tif",
];

/// Default video extensions
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "wmv", "flv", "webm", "m4v", "3gp",
];

/// Whether a file is a still image or a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify by extension using the default extension sets
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Classify a path using the default extension sets
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// A discovered media file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Media kind derived from the extension
    pub kind: MediaKind,
}

/// Result of a full scan
#[derive(Debug)]
pub struct ScanResult {
    /// Discovered files, in walk order
    pub files: Vec<MediaFile>,
    /// Entries that could not be read (non-fatal)
    pub errors: Vec<ScanError>,
}

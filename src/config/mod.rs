//! # Config Module
//!
//! Settings shared by the CLI and the pipeline builder.
//!
//! Values come from `OrganizerConfig::default()`, optionally overlaid by a
//! JSON file, and finally by command-line flags.

use crate::core::scanner::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::core::transfer::{OperationMode, DEFAULT_CHUNK_SIZE};
use crate::error::OrganizerError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the directory used for default report output
const APP_DIR: &str = "media-organizer";

/// Organizer settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrganizerConfig {
    /// Extensions treated as images (case-insensitive, without the dot)
    pub image_extensions: Vec<String>,
    /// Extensions treated as videos (case-insensitive, without the dot)
    pub video_extensions: Vec<String>,
    /// Copy or move
    pub mode: OperationMode,
    /// Byte-compare colliding files
    pub verify_identity: bool,
    /// Where reports are written (None = platform default)
    pub report_dir: Option<PathBuf>,
    /// Program used to probe videos
    pub ffprobe: PathBuf,
    /// Include dot-files and dot-directories
    pub include_hidden: bool,
    /// Follow symbolic links while scanning
    pub follow_symlinks: bool,
    /// Emit a progress update every N files
    pub progress_every: usize,
    /// Chunk size for byte comparison
    pub compare_chunk_size: usize,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            image_extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            video_extensions: VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            mode: OperationMode::Copy,
            verify_identity: false,
            report_dir: None,
            ffprobe: PathBuf::from("ffprobe"),
            include_hidden: true,
            follow_symlinks: false,
            progress_every: 10,
            compare_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl OrganizerConfig {
    /// Load settings from a JSON file; absent keys keep their defaults
    pub fn load(path: &Path) -> Result<Self, OrganizerError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            OrganizerError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            OrganizerError::Config(format!("Invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), OrganizerError> {
        if self.progress_every == 0 {
            return Err(OrganizerError::Config(
                "progress_every must be at least 1".to_string(),
            ));
        }
        if self.compare_chunk_size == 0 {
            return Err(OrganizerError::Config(
                "compare_chunk_size must be at least 1".to_string(),
            ));
        }
        if self.image_extensions.is_empty() && self.video_extensions.is_empty() {
            return Err(OrganizerError::Config(
                "at least one image or video extension is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Report directory, falling back to the platform data directory
    pub fn resolved_report_dir(&self) -> PathBuf {
        self.report_dir.clone().unwrap_or_else(default_report_dir)
    }
}

/// `<data-local>/media-organizer/logs`, or `./logs` when no data dir is known
pub fn default_report_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR).join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn defaults_cover_both_media_kinds() {
        let config = OrganizerConfig::default();
        assert!(config.image_extensions.contains(&"jpg".to_string()));
        assert!(config.video_extensions.contains(&"3gp".to_string()));
        assert_eq!(config.mode, OperationMode::Copy);
        assert_eq!(config.progress_every, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_overlays_only_given_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(br#"{ "mode": "move", "verify_identity": true }"#)
            .unwrap();

        let config = OrganizerConfig::load(&path).unwrap();
        assert_eq!(config.mode, OperationMode::Move);
        assert!(config.verify_identity);
        assert_eq!(config.ffprobe, PathBuf::from("ffprobe"));
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let result = OrganizerConfig::load(&path);
        assert!(matches!(result, Err(OrganizerError::Config(_))));
    }

    #[test]
    fn zero_progress_interval_is_rejected() {
        let config = OrganizerConfig {
            progress_every: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

//! Directory walking implementation using walkdir.

use super::filter::{is_hidden, MediaFilter};
use super::{MediaFile, ScanResult};
use crate::error::ScanError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Custom image extensions (None = use defaults)
    pub image_extensions: Option<Vec<String>>,
    /// Custom video extensions (None = use defaults)
    pub video_extensions: Option<Vec<String>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: true,
            max_depth: None,
            image_extensions: None,
            video_extensions: None,
        }
    }
}

/// Scanner implementation using the walkdir crate
#[derive(Debug, Clone)]
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: MediaFilter,
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = MediaFilter::new().with_hidden(config.include_hidden);

        if let Some(ref extensions) = config.image_extensions {
            filter = filter.with_image_extensions(extensions);
        }
        if let Some(ref extensions) = config.video_extensions {
            filter = filter.with_video_extensions(extensions);
        }

        Self { config, filter }
    }

    /// Lazily walk `root`, yielding recognized media files depth-first.
    ///
    /// Each call starts a fresh walk. Order follows the filesystem and is not
    /// stable across runs.
    pub fn files(&self, root: &Path) -> MediaFiles<'_> {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());

        let mut walker = WalkDir::new(&root).follow_links(self.config.follow_symlinks);
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        MediaFiles {
            inner: walker.into_iter(),
            filter: &self.filter,
            errors: Vec::new(),
        }
    }

    /// Walk `root` to completion, collecting files and non-fatal errors
    pub fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        info!(root = %root.display(), "Starting scan");
        let mut walk = self.files(root);
        let files: Vec<MediaFile> = walk.by_ref().collect();
        let errors = walk.into_errors();
        info!(
            found = files.len(),
            skipped = errors.len(),
            "Scan complete"
        );

        Ok(ScanResult { files, errors })
    }
}

/// Lazy sequence of media files under a root
pub struct MediaFiles<'a> {
    inner: walkdir::IntoIter,
    filter: &'a MediaFilter,
    errors: Vec<ScanError>,
}

impl MediaFiles<'_> {
    /// Entries skipped so far because they could not be read
    pub fn errors(&self) -> &[ScanError] {
        &self.errors
    }

    /// Consume the walk, returning the skipped entries
    pub fn into_errors(self) -> Vec<ScanError> {
        self.errors
    }

    fn record_error(&mut self, err: walkdir::Error) {
        let path = err.path().map(PathBuf::from).unwrap_or_default();

        let denied = err.io_error().map(|e| e.kind()) == Some(std::io::ErrorKind::PermissionDenied);
        let error = if denied {
            ScanError::PermissionDenied { path }
        } else {
            let source = err
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
            ScanError::ReadDirectory { path, source }
        };

        warn!("Skipping unreadable entry: {}", error);
        self.errors.push(error);
    }
}

impl Iterator for MediaFiles<'_> {
    type Item = MediaFile;

    fn next(&mut self) -> Option<MediaFile> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    self.record_error(err);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if entry.depth() > 0 && !self.filter.include_hidden() && is_hidden(entry.path())
                {
                    debug!(dir = %entry.path().display(), "Skipping hidden directory");
                    self.inner.skip_current_dir();
                }
                continue;
            }

            if let Some(kind) = self.filter.classify(entry.path()) {
                return Some(MediaFile {
                    path: entry.into_path(),
                    kind,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::MediaKind;
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        path
    }

    #[test]
    fn scan_empty_directory_returns_empty_vec() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = WalkDirScanner::new(ScanConfig::default());

        let result = scanner.scan(temp_dir.path()).unwrap();

        assert!(result.files.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn scan_finds_images_and_videos_with_kinds() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "photo.JPG");
        create_file(temp_dir.path(), "clip.mov");
        create_file(temp_dir.path(), "notes.txt");

        let scanner = WalkDirScanner::new(ScanConfig::default());
        let result = scanner.scan(temp_dir.path()).unwrap();

        assert_eq!(result.files.len(), 2);
        let photo = result
            .files
            .iter()
            .find(|f| f.path.ends_with("photo.JPG"))
            .unwrap();
        assert_eq!(photo.kind, MediaKind::Image);
        let clip = result
            .files
            .iter()
            .find(|f| f.path.ends_with("clip.mov"))
            .unwrap();
        assert_eq!(clip.kind, MediaKind::Video);
    }

    #[test]
    fn scan_yields_absolute_paths() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "photo.png");

        let scanner = WalkDirScanner::new(ScanConfig::default());
        let files: Vec<_> = scanner.files(temp_dir.path()).collect();

        assert_eq!(files.len(), 1);
        assert!(files[0].path.is_absolute());
    }

    #[test]
    fn scan_traverses_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        create_file(temp_dir.path(), "root.jpg");
        create_file(&nested, "nested.mp4");

        let scanner = WalkDirScanner::new(ScanConfig::default());
        let result = scanner.scan(temp_dir.path()).unwrap();

        assert_eq!(result.files.len(), 2);
    }

    #[test]
    fn files_can_be_walked_again() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "one.jpg");
        create_file(temp_dir.path(), "two.jpg");

        let scanner = WalkDirScanner::new(ScanConfig::default());
        assert_eq!(scanner.files(temp_dir.path()).count(), 2);
        assert_eq!(scanner.files(temp_dir.path()).count(), 2);
    }

    #[test]
    fn hidden_directories_skipped_when_configured() {
        let temp_dir = TempDir::new().unwrap();
        let hidden = temp_dir.path().join(".thumbnails");
        fs::create_dir(&hidden).unwrap();
        create_file(&hidden, "thumb.jpg");
        create_file(temp_dir.path(), "visible.jpg");

        let default_scanner = WalkDirScanner::new(ScanConfig::default());
        assert_eq!(default_scanner.files(temp_dir.path()).count(), 2);

        let config = ScanConfig {
            include_hidden: false,
            ..Default::default()
        };
        let scanner = WalkDirScanner::new(config);
        let files: Vec<_> = scanner.files(temp_dir.path()).collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("visible.jpg"));
    }

    #[test]
    fn scan_nonexistent_directory_returns_error() {
        let scanner = WalkDirScanner::new(ScanConfig::default());
        let result = scanner.scan(Path::new("/nonexistent/path/12345"));

        assert!(matches!(result, Err(ScanError::DirectoryNotFound { .. })));
    }

    #[test]
    fn lazy_walk_of_missing_root_records_error() {
        let scanner = WalkDirScanner::new(ScanConfig::default());
        let mut walk = scanner.files(Path::new("/nonexistent/path/12345"));

        assert!(walk.next().is_none());
        assert_eq!(walk.errors().len(), 1);
    }
}

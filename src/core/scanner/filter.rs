//! File filtering logic for the scanner.

use super::{MediaKind, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use std::collections::HashSet;
use std::path::Path;

/// Decides whether a file is a recognized image or video
#[derive(Debug, Clone)]
pub struct MediaFilter {
    image_extensions: HashSet<String>,
    video_extensions: HashSet<String>,
    include_hidden: bool,
}

impl MediaFilter {
    /// Create a new filter with the default extension sets
    pub fn new() -> Self {
        Self {
            image_extensions: normalize(IMAGE_EXTENSIONS.iter().copied()),
            video_extensions: normalize(VIDEO_EXTENSIONS.iter().copied()),
            include_hidden: true,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Override the image extensions
    pub fn with_image_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.image_extensions = normalize(extensions);
        self
    }

    /// Override the video extensions
    pub fn with_video_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.video_extensions = normalize(extensions);
        self
    }

    pub fn include_hidden(&self) -> bool {
        self.include_hidden
    }

    /// Media kind of a file, or None if it should be skipped
    pub fn classify(&self, path: &Path) -> Option<MediaKind> {
        if !self.include_hidden && is_hidden(path) {
            return None;
        }

        let ext = path.extension()?.to_str()?.to_lowercase();
        if self.image_extensions.contains(&ext) {
            Some(MediaKind::Image)
        } else if self.video_extensions.contains(&ext) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// True if the final path component starts with a dot
pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

fn normalize<I, S>(extensions: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

//! # Date Module
//!
//! Resolves the calendar date a media file was captured.
//!
//! Each media kind has an ordered chain of sources; the first source that
//! yields a parseable timestamp wins:
//!
//! | Kind  | Chain                                                       |
//! |-------|-------------------------------------------------------------|
//! | Image | EXIF 36867 → EXIF 36868 → EXIF 306 → file modification time |
//! | Video | container `creation_time` → file modification time          |
//!
//! Embedded timestamps are naive wall-clock values and are used as-is.
//! Modification times are converted to local time.

mod parse;

pub use parse::{parse_container_datetime, parse_exif_datetime};

use crate::core::metadata::{
    ExifTags, ImageMetadataReader, TAG_DATE_TIME, TAG_DATE_TIME_DIGITIZED, TAG_DATE_TIME_ORIGINAL,
};
use crate::core::probe::{find_tag, ContainerTags, VideoProbe};
use crate::core::scanner::MediaKind;
use crate::error::DateError;
use chrono::{DateTime, Datelike, Local, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Container tag holding a video's creation time
pub const CREATION_TIME_TAG: &str = "creation_time";

/// Where a resolved date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// An EXIF tag, by number
    ExifTag(u16),
    /// A video container tag, by name
    ContainerTag(&'static str),
    /// The file's last modification time
    FileModified,
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSource::ExifTag(TAG_DATE_TIME_ORIGINAL) => write!(f, "EXIF DateTimeOriginal"),
            DateSource::ExifTag(TAG_DATE_TIME_DIGITIZED) => write!(f, "EXIF DateTimeDigitized"),
            DateSource::ExifTag(TAG_DATE_TIME) => write!(f, "EXIF DateTime"),
            DateSource::ExifTag(tag) => write!(f, "EXIF tag {}", tag),
            DateSource::ContainerTag(name) => write!(f, "container {}", name),
            DateSource::FileModified => write!(f, "file modified time"),
        }
    }
}

/// Fallback chain for images
pub const IMAGE_DATE_CHAIN: &[DateSource] = &[
    DateSource::ExifTag(TAG_DATE_TIME_ORIGINAL),
    DateSource::ExifTag(TAG_DATE_TIME_DIGITIZED),
    DateSource::ExifTag(TAG_DATE_TIME),
    DateSource::FileModified,
];

/// Fallback chain for videos
pub const VIDEO_DATE_CHAIN: &[DateSource] = &[
    DateSource::ContainerTag(CREATION_TIME_TAG),
    DateSource::FileModified,
];

/// The chain consulted for a media kind
pub fn chain_for(kind: MediaKind) -> &'static [DateSource] {
    match kind {
        MediaKind::Image => IMAGE_DATE_CHAIN,
        MediaKind::Video => VIDEO_DATE_CHAIN,
    }
}

/// A capture date together with its provenance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub value: NaiveDateTime,
    pub source: DateSource,
}

impl ResolvedDate {
    pub fn new(value: NaiveDateTime, source: DateSource) -> Self {
        Self { value, source }
    }

    pub fn year(&self) -> i32 {
        self.value.year()
    }

    pub fn month(&self) -> u32 {
        self.value.month()
    }

    pub fn day(&self) -> u32 {
        self.value.day()
    }
}

/// Metadata fetched at most once per resolution
#[derive(Default)]
struct Fetched {
    exif: Option<Option<ExifTags>>,
    container: Option<Option<ContainerTags>>,
}

/// Walks a media kind's date chain
#[derive(Clone)]
pub struct DateResolver {
    exif: Arc<dyn ImageMetadataReader>,
    probe: Arc<dyn VideoProbe>,
}

impl DateResolver {
    pub fn new(exif: Arc<dyn ImageMetadataReader>, probe: Arc<dyn VideoProbe>) -> Self {
        Self { exif, probe }
    }

    /// Resolve the capture date of `path`.
    ///
    /// Fails only when no embedded date is usable and the modification
    /// time cannot be read either.
    pub fn resolve(&self, path: &Path, kind: MediaKind) -> Result<ResolvedDate, DateError> {
        let mut fetched = Fetched::default();

        for source in chain_for(kind) {
            let candidate = match *source {
                DateSource::ExifTag(tag) => self.exif_value(path, tag, &mut fetched),
                DateSource::ContainerTag(name) => self.container_value(path, name, &mut fetched),
                DateSource::FileModified => {
                    let value = modified_time(path)?;
                    debug!(path = %path.display(), "Using file modification time");
                    return Ok(ResolvedDate::new(value, DateSource::FileModified));
                }
            };

            if let Some(value) = candidate {
                debug!(path = %path.display(), source = %source, "Resolved date {}", value);
                return Ok(ResolvedDate::new(value, *source));
            }
        }

        // Chains end in FileModified
        modified_time(path).map(|value| ResolvedDate::new(value, DateSource::FileModified))
    }

    fn exif_value(&self, path: &Path, tag: u16, fetched: &mut Fetched) -> Option<NaiveDateTime> {
        let tags = fetched
            .exif
            .get_or_insert_with(|| self.exif.read_tags(path))
            .as_ref()?;
        let raw = tags.get(&tag)?;
        let parsed = parse_exif_datetime(raw);
        if parsed.is_none() {
            warn!(path = %path.display(), tag, "Unparseable EXIF date {:?}", raw);
        }
        parsed
    }

    fn container_value(
        &self,
        path: &Path,
        name: &str,
        fetched: &mut Fetched,
    ) -> Option<NaiveDateTime> {
        let tags = fetched
            .container
            .get_or_insert_with(|| match self.probe.container_tags(path) {
                Ok(tags) => Some(tags),
                Err(e) => {
                    debug!(path = %path.display(), "No container tags: {}", e);
                    None
                }
            })
            .as_ref()?;
        let raw = find_tag(tags, name)?;
        let parsed = parse_container_datetime(raw);
        if parsed.is_none() {
            warn!(path = %path.display(), tag = name, "Unparseable container date {:?}", raw);
        }
        parsed
    }
}

/// File modification time as local wall-clock time
fn modified_time(path: &Path) -> Result<NaiveDateTime, DateError> {
    let modified = fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|source| DateError::Exhausted {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}

//! # Metadata Module
//!
//! Reads embedded EXIF tags from image files.
//!
//! The reader returns a map of numeric tag IDs to their text values, which
//! keeps the date resolver independent of the EXIF library. Tags of interest:
//! - `DateTimeOriginal` (36867) - when the shutter fired
//! - `DateTimeDigitized` (36868) - when the image was stored
//! - `DateTime` (306) - last modification recorded by the camera or editor
//!
//! EXIF is found in JPEG, TIFF, HEIF, PNG (`eXIf`) and WebP containers.

use exif::{In, Reader, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// EXIF `DateTimeOriginal`
pub const TAG_DATE_TIME_ORIGINAL: u16 = 36867;
/// EXIF `DateTimeDigitized`
pub const TAG_DATE_TIME_DIGITIZED: u16 = 36868;
/// TIFF `DateTime`
pub const TAG_DATE_TIME: u16 = 306;
/// TIFF `Make`
pub const TAG_MAKE: u16 = 271;
/// TIFF `Model`
pub const TAG_MODEL: u16 = 272;

/// Text-valued EXIF tags keyed by tag number
pub type ExifTags = HashMap<u16, String>;

/// Source of embedded image metadata
pub trait ImageMetadataReader: Send + Sync {
    /// Read the primary image's text tags. None if the file has no readable EXIF.
    fn read_tags(&self, path: &Path) -> Option<ExifTags>;
}

/// `ImageMetadataReader` backed by kamadak-exif
#[derive(Debug, Clone, Copy, Default)]
pub struct KamadakExifReader;

impl ImageMetadataReader for KamadakExifReader {
    fn read_tags(&self, path: &Path) -> Option<ExifTags> {
        let file = File::open(path).ok()?;
        let mut bufreader = BufReader::new(file);
        let exif = match Reader::new().read_from_container(&mut bufreader) {
            Ok(exif) => exif,
            Err(e) => {
                debug!(path = %path.display(), "No EXIF data: {}", e);
                return None;
            }
        };

        let tags = exif
            .fields()
            .filter(|field| field.ifd_num == In::PRIMARY)
            .filter_map(|field| {
                get_string_value(&field.value).map(|text| (field.tag.number(), text))
            })
            .collect();

        Some(tags)
    }
}

/// Camera description from make and model tags
pub fn camera_display(tags: &ExifTags) -> Option<String> {
    match (tags.get(&TAG_MAKE), tags.get(&TAG_MODEL)) {
        (Some(make), Some(model)) => {
            // Avoid duplication like "Apple Apple iPhone"
            if model.starts_with(make.as_str()) {
                Some(model.clone())
            } else {
                Some(format!("{} {}", make, model))
            }
        }
        (None, Some(model)) => Some(model.clone()),
        (Some(make), None) => Some(make.clone()),
        (None, None) => None,
    }
}

/// Helper to extract string from EXIF ASCII value
fn get_string_value(value: &Value) -> Option<String> {
    if let Value::Ascii(ref vec) = value {
        if let Some(bytes) = vec.first() {
            if let Ok(s) = std::str::from_utf8(bytes) {
                let trimmed = s.trim_end_matches('\0').trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

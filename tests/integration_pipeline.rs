//! Integration tests for the pipeline module.
//!
//! These tests verify end-to-end batch behavior including:
//! - Date-based placement from EXIF and from modification time
//! - Re-running a batch over an organized tree
//! - Move safety and duplicate safety
//! - Exact identity verification

use assert_fs::prelude::*;
use assert_fs::TempDir;
use chrono::{Local, NaiveDate, TimeZone};
use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use filetime::FileTime;
use image::{Rgb, RgbImage};
use media_organizer::core::pipeline::{BatchResult, Pipeline};
use media_organizer::core::probe::{ContainerTags, VideoProbe};
use media_organizer::core::transfer::{IdentityVerdict, OperationMode};
use media_organizer::error::ProbeError;
use predicates::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Videos are never probed in these tests; reject anything that asks
struct NoVideoProbe;

impl VideoProbe for NoVideoProbe {
    fn verify_video_stream(&self, path: &Path) -> Result<(), ProbeError> {
        Err(ProbeError::NoVideoStream {
            path: path.to_path_buf(),
        })
    }

    fn container_tags(&self, _path: &Path) -> Result<ContainerTags, ProbeError> {
        Ok(ContainerTags::new())
    }
}

/// JPEG with a DateTimeOriginal tag spliced in as an APP1 segment
fn write_jpeg_with_exif(path: &Path, date_time_original: &str, shade: u8) {
    let mut jpeg = Vec::new();
    RgbImage::from_pixel(16, 16, Rgb([shade, 100, 50]))
        .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
        .unwrap();

    let field = Field {
        tag: Tag::DateTimeOriginal,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![date_time_original.as_bytes().to_vec()]),
    };
    let mut writer = Writer::new();
    writer.push_field(&field);
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let mut app1 = vec![0xFF, 0xE1];
    app1.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&tiff);

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    fs::write(path, out).unwrap();
}

/// PNG (no EXIF) whose modification time is noon local time on the given day
fn write_png_with_mtime(path: &Path, y: i32, m: u32, d: u32) {
    RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])).save(path).unwrap();
    let noon = NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let local = Local.from_local_datetime(&noon).single().unwrap();
    filetime::set_file_mtime(path, FileTime::from_unix_time(local.timestamp(), 0)).unwrap();
}

fn run(source: &Path, destination: &Path, mode: OperationMode, verify: bool) -> BatchResult {
    Pipeline::builder()
        .source(source)
        .destination(destination)
        .mode(mode)
        .verify_identity(verify)
        .video_probe(Arc::new(NoVideoProbe))
        .build()
        .run()
        .unwrap()
}

#[test]
fn files_land_in_dated_folders() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_jpeg_with_exif(src.child("a.jpg").path(), "2024:01:15 10:30:00", 10);
    write_png_with_mtime(src.child("b.png").path(), 2023, 6, 1);

    let result = run(src.path(), dest.path(), OperationMode::Copy, false);

    assert_eq!(result.total(), 2);
    assert_eq!(result.success_count(), 2);
    assert_eq!(result.image_count(), 2);
    dest.child("2024/01/15/a.jpg").assert(predicate::path::exists());
    dest.child("2023/06/01/b.png").assert(predicate::path::exists());
    src.child("a.jpg").assert(predicate::path::exists());
    src.child("b.png").assert(predicate::path::exists());
}

#[test]
fn second_run_reports_only_duplicates() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_jpeg_with_exif(src.child("a.jpg").path(), "2024:01:15 10:30:00", 10);
    write_png_with_mtime(src.child("b.png").path(), 2023, 6, 1);

    run(src.path(), dest.path(), OperationMode::Copy, false);
    let second = run(src.path(), dest.path(), OperationMode::Copy, false);

    assert_eq!(second.success_count(), 0);
    assert_eq!(second.duplicate_count(), 2);
    assert!(second
        .duplicates()
        .iter()
        .all(|d| d.verdict == IdentityVerdict::Unknown));
}

#[test]
fn move_never_loses_a_file() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_png_with_mtime(src.child("b.png").path(), 2023, 6, 1);
    let original = fs::read(src.child("b.png").path()).unwrap();

    let result = run(src.path(), dest.path(), OperationMode::Move, false);

    assert_eq!(result.success_count(), 1);
    src.child("b.png").assert(predicate::path::missing());
    let moved = dest.child("2023/06/01/b.png");
    moved.assert(predicate::path::exists());
    assert_eq!(fs::read(moved.path()).unwrap(), original);
}

#[test]
fn occupied_destination_is_never_overwritten() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_png_with_mtime(src.child("b.png").path(), 2023, 6, 1);
    dest.child("2023/06/01").create_dir_all().unwrap();
    dest.child("2023/06/01/b.png")
        .write_binary(b"someone else's file")
        .unwrap();

    let result = run(src.path(), dest.path(), OperationMode::Move, false);

    assert_eq!(result.duplicate_count(), 1);
    assert_eq!(
        fs::read(dest.child("2023/06/01/b.png").path()).unwrap(),
        b"someone else's file"
    );
    src.child("b.png").assert(predicate::path::exists());
}

#[test]
fn verification_separates_identical_from_different() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();

    write_jpeg_with_exif(src.child("same.jpg").path(), "2024:01:15 10:30:00", 10);
    write_jpeg_with_exif(src.child("diff.jpg").path(), "2024:01:15 10:30:00", 20);
    run(src.path(), dest.path(), OperationMode::Copy, false);

    // Re-shoot one file so only its bytes differ
    write_jpeg_with_exif(src.child("diff.jpg").path(), "2024:01:15 10:30:00", 200);

    let result = run(src.path(), dest.path(), OperationMode::Copy, true);

    assert_eq!(result.duplicate_count(), 2);
    for record in result.duplicates() {
        let expected = if record.source.ends_with("same.jpg") {
            IdentityVerdict::Identical
        } else {
            IdentityVerdict::Different
        };
        assert_eq!(record.verdict, expected, "{}", record.source.display());
    }
}

#[test]
fn corrupt_and_unsupported_files() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    src.child("corrupt.jpg")
        .write_binary(b"this is not a valid image file")
        .unwrap();
    src.child("clip.mp4").write_binary(b"not a video").unwrap();
    src.child("notes.txt").write_str("ignored").unwrap();

    let result = run(src.path(), dest.path(), OperationMode::Copy, false);

    assert_eq!(result.total(), 2);
    assert_eq!(result.invalid_count(), 2);
    assert_eq!(result.success_count(), 0);
    src.child("corrupt.jpg").assert(predicate::path::exists());
}

#[test]
fn truncated_photo_is_invalid_and_not_copied() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let photo = src.child("cut.jpg");
    write_jpeg_with_exif(photo.path(), "2021:07:04 09:00:00", 120);
    let bytes = fs::read(photo.path()).unwrap();
    photo.write_binary(&bytes[..bytes.len() - 20]).unwrap();

    let result = run(src.path(), dest.path(), OperationMode::Move, false);

    assert_eq!(result.invalid_count(), 1);
    assert_eq!(result.success_count(), 0);
    photo.assert(predicate::path::exists());
    dest.child("2021").assert(predicate::path::missing());
}

#[test]
fn nested_directories_are_scanned() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    src.child("2019/trip/day1").create_dir_all().unwrap();
    write_png_with_mtime(src.child("2019/trip/day1/x.PNG").path(), 2019, 4, 2);

    let result = run(src.path(), dest.path(), OperationMode::Copy, false);

    assert_eq!(result.success_count(), 1);
    dest.child("2019/04/02/x.PNG").assert(predicate::path::exists());
}

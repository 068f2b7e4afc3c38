//! # Reporter Module
//!
//! Plain-text batch reports, one record per line.
//!
//! | Report    | Line format                           |
//! |-----------|---------------------------------------|
//! | invalid   | `source | reason`                     |
//! | success   | `source  -->  destination`            |
//! | duplicate | `source  -->  existing [verdict]`     |
//!
//! Each file starts with a generated-at header and an `=` rule. Files are
//! named `<kind>_report_<YYYYmmdd_HHMMSS>.txt`. They are meant for people,
//! not for parsing back.

use crate::core::pipeline::{DuplicateRecord, FailureRecord, SuccessRecord};
use crate::error::ReportError;
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const RULE_WIDTH: usize = 80;

/// Which report a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Invalid,
    Success,
    Duplicate,
}

impl ReportKind {
    fn slug(self) -> &'static str {
        match self {
            ReportKind::Invalid => "invalid",
            ReportKind::Success => "success",
            ReportKind::Duplicate => "duplicate",
        }
    }

    fn title(self) -> &'static str {
        match self {
            ReportKind::Invalid => "Invalid files",
            ReportKind::Success => "Organized files",
            ReportKind::Duplicate => "Duplicate files",
        }
    }
}

fn write_header<W: Write>(writer: &mut W, kind: ReportKind, at: DateTime<Local>) -> io::Result<()> {
    writeln!(
        writer,
        "{} - generated {}",
        kind.title(),
        at.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(writer, "{}", "=".repeat(RULE_WIDTH))
}

/// Write the invalid-file report
pub fn write_invalid_report<W: Write>(
    records: &[FailureRecord],
    mut writer: W,
    at: DateTime<Local>,
) -> io::Result<()> {
    write_header(&mut writer, ReportKind::Invalid, at)?;
    for record in records {
        writeln!(writer, "{} | {}", record.source.display(), record.reason)?;
    }
    writer.flush()
}

/// Write the success report
pub fn write_success_report<W: Write>(
    records: &[SuccessRecord],
    mut writer: W,
    at: DateTime<Local>,
) -> io::Result<()> {
    write_header(&mut writer, ReportKind::Success, at)?;
    for record in records {
        writeln!(
            writer,
            "{}  -->  {}",
            record.source.display(),
            record.destination.display()
        )?;
    }
    writer.flush()
}

/// Write the duplicate report
pub fn write_duplicate_report<W: Write>(
    records: &[DuplicateRecord],
    mut writer: W,
    at: DateTime<Local>,
) -> io::Result<()> {
    write_header(&mut writer, ReportKind::Duplicate, at)?;
    for record in records {
        writeln!(
            writer,
            "{}  -->  {} [{}]",
            record.source.display(),
            record.existing.display(),
            record.verdict
        )?;
    }
    writer.flush()
}

/// Writes timestamped report files into one directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_invalid(&self, records: &[FailureRecord]) -> Result<PathBuf, ReportError> {
        self.write(ReportKind::Invalid, |w, at| write_invalid_report(records, w, at))
    }

    pub fn write_success(&self, records: &[SuccessRecord]) -> Result<PathBuf, ReportError> {
        self.write(ReportKind::Success, |w, at| write_success_report(records, w, at))
    }

    pub fn write_duplicates(&self, records: &[DuplicateRecord]) -> Result<PathBuf, ReportError> {
        self.write(ReportKind::Duplicate, |w, at| {
            write_duplicate_report(records, w, at)
        })
    }

    fn write<F>(&self, kind: ReportKind, body: F) -> Result<PathBuf, ReportError>
    where
        F: FnOnce(&mut BufWriter<File>, DateTime<Local>) -> io::Result<()>,
    {
        fs::create_dir_all(&self.dir).map_err(|source| ReportError::CreateDirectory {
            path: self.dir.clone(),
            source,
        })?;

        let at = Local::now();
        let path = self.dir.join(format!(
            "{}_report_{}.txt",
            kind.slug(),
            at.format("%Y%m%d_%H%M%S")
        ));

        let write_err = |source| ReportError::Write {
            path: path.clone(),
            source,
        };
        let file = File::create(&path).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        body(&mut writer, at).map_err(write_err)?;

        info!(report = %path.display(), "Wrote {} report", kind.slug());
        Ok(path)
    }
}

//! Destination path derivation.

use crate::core::date::ResolvedDate;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// `<root>/<YYYY>/<MM>/<DD>/<file_name>`
///
/// Two sources sharing a basename and a date derive the same path; that
/// collision is what the transfer engine reports as a duplicate.
pub fn derive_destination(root: &Path, date: &ResolvedDate, file_name: &OsStr) -> PathBuf {
    root.join(format!("{:04}", date.year()))
        .join(format!("{:02}", date.month()))
        .join(format!("{:02}", date.day()))
        .join(file_name)
}

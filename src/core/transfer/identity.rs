//! Exact byte comparison between a source and the file occupying its destination.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Default comparison chunk (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Result of comparing a colliding source with the existing destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentityVerdict {
    Identical,
    Different,
    /// Comparison was not requested
    #[default]
    Unknown,
}

impl From<bool> for IdentityVerdict {
    fn from(identical: bool) -> Self {
        if identical {
            IdentityVerdict::Identical
        } else {
            IdentityVerdict::Different
        }
    }
}

impl fmt::Display for IdentityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityVerdict::Identical => write!(f, "identical"),
            IdentityVerdict::Different => write!(f, "different"),
            IdentityVerdict::Unknown => write!(f, "unverified"),
        }
    }
}

/// True only if both files have the same length and the same bytes.
///
/// Any I/O error yields false.
pub fn files_identical(a: &Path, b: &Path) -> bool {
    files_identical_with_chunk(a, b, DEFAULT_CHUNK_SIZE)
}

/// `files_identical` with an explicit chunk size
pub fn files_identical_with_chunk(a: &Path, b: &Path, chunk_size: usize) -> bool {
    match compare(a, b, chunk_size.max(1)) {
        Ok(same) => same,
        Err(e) => {
            debug!(a = %a.display(), b = %b.display(), "Comparison failed: {}", e);
            false
        }
    }
}

/// True when both paths name the same file on disk.
///
/// Paths are compared after resolving `..` and symlinks; on Unix hard links
/// are caught by device and inode. Any I/O error yields false.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) if a == b => return true,
        (Ok(_), Ok(_)) => {}
        _ => return false,
    }
    same_inode(a, b)
}

#[cfg(unix)]
fn same_inode(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_inode(_a: &Path, _b: &Path) -> bool {
    false
}

fn compare(a: &Path, b: &Path, chunk_size: usize) -> io::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(File::open(a)?);
    let mut reader_b = BufReader::new(File::open(b)?);
    let mut buf_a = vec![0u8; chunk_size];
    let mut buf_b = vec![0u8; chunk_size];

    loop {
        let read_a = fill(&mut reader_a, &mut buf_a)?;
        let read_b = fill(&mut reader_b, &mut buf_b)?;

        if read_a != read_b || buf_a[..read_a] != buf_b[..read_b] {
            return Ok(false);
        }
        if read_a == 0 {
            return Ok(true);
        }
    }
}

/// Read until `buf` is full or the stream ends
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn same_bytes_are_identical() {
        let dir = TempDir::new().unwrap();
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let a = write(&dir, "a.bin", &data);
        let b = write(&dir, "b.bin", &data);

        assert!(files_identical(&a, &b));
        assert!(files_identical_with_chunk(&a, &b, 7));
    }

    #[test]
    fn differing_last_byte_is_detected() {
        let dir = TempDir::new().unwrap();
        let mut data = vec![42u8; 4096];
        let a = write(&dir, "a.bin", &data);
        *data.last_mut().unwrap() = 0;
        let b = write(&dir, "b.bin", &data);

        assert!(!files_identical_with_chunk(&a, &b, 1000));
    }

    #[test]
    fn size_mismatch_is_different() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.bin", b"short");
        let b = write(&dir, "b.bin", b"shorter");
        assert!(!files_identical(&a, &b));
    }

    #[test]
    fn empty_files_are_identical() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.bin", b"");
        let b = write(&dir, "b.bin", b"");
        assert!(files_identical(&a, &b));
    }

    #[test]
    fn io_error_means_not_identical() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.bin", b"data");
        assert!(!files_identical(&a, &dir.path().join("missing.bin")));
    }

    #[test]
    fn verdict_from_bool() {
        assert_eq!(IdentityVerdict::from(true), IdentityVerdict::Identical);
        assert_eq!(IdentityVerdict::from(false), IdentityVerdict::Different);
        assert_eq!(IdentityVerdict::default(), IdentityVerdict::Unknown);
    }

    #[test]
    fn dotdot_spelling_is_the_same_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let a = write(&dir, "a.bin", b"data");
        let b = write(&dir, "b.bin", b"data");
        let roundabout = dir.path().join("sub").join("..").join("a.bin");

        assert!(same_file(&a, &roundabout));
        assert!(!same_file(&a, &b));
        assert!(!same_file(&a, &dir.path().join("missing.bin")));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_and_hard_link_are_the_same_file() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.bin", b"data");
        let link = dir.path().join("link.bin");
        std::os::unix::fs::symlink(&a, &link).unwrap();
        let hard = dir.path().join("hard.bin");
        fs::hard_link(&a, &hard).unwrap();

        assert!(same_file(&a, &link));
        assert!(same_file(&a, &hard));
    }
}

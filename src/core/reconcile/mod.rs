//! # Reconcile Module
//!
//! Post-batch review of duplicate collisions.
//!
//! The reconciler owns a working copy of the batch's duplicate list plus a
//! set of indices marked for deletion. Every removal renumbers the marks and
//! the focus in the same call that touches the filesystem, so an index can
//! never drift onto a different `{source, existing}` pair.
//!
//! Only two files are ever written or deleted for a record: replace
//! overwrites the record's `existing` file, delete removes its `source`.
//! Neither happens when both paths name the same file, since that would
//! destroy the only copy.

mod preview;

pub use preview::{FileDetails, PreviewLoader, RecordPreview};

use crate::core::pipeline::{BatchResult, DuplicateRecord};
use crate::core::transfer::{copy_with_times, same_file, IdentityVerdict};
use crate::error::ReconcileError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use tracing::{info, warn};

/// Where the review stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Reviewing { index: usize },
    Completed,
}

/// Identifies the record a preview was requested for.
///
/// A preview is applied only if its token still equals the reconciler's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewToken {
    pub index: usize,
    pub revision: u64,
}

/// Counters for what the review has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub replaced: usize,
    pub deleted: usize,
    pub remaining: usize,
}

/// Duplicate review state machine
#[derive(Debug, Clone)]
pub struct Reconciler {
    records: Vec<DuplicateRecord>,
    marked: BTreeSet<usize>,
    index: usize,
    revision: u64,
    replaced: usize,
    deleted: usize,
}

impl Reconciler {
    pub fn new(records: Vec<DuplicateRecord>) -> Self {
        Self {
            records,
            marked: BTreeSet::new(),
            index: 0,
            revision: 0,
            replaced: 0,
            deleted: 0,
        }
    }

    /// Review the duplicates of a finished batch
    pub fn from_result(result: &BatchResult) -> Self {
        Self::new(result.duplicates().to_vec())
    }

    pub fn state(&self) -> ReviewState {
        if self.records.is_empty() {
            ReviewState::Completed
        } else {
            ReviewState::Reviewing { index: self.index }
        }
    }

    pub fn is_completed(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DuplicateRecord] {
        &self.records
    }

    /// Focused index (meaningless once completed)
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&DuplicateRecord> {
        self.records.get(self.index)
    }

    pub fn is_marked(&self, index: usize) -> bool {
        self.marked.contains(&index)
    }

    /// Marked indices in ascending order
    pub fn marked(&self) -> impl Iterator<Item = usize> + '_ {
        self.marked.iter().copied()
    }

    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    /// Focus `index`; false if out of bounds
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.records.len() {
            self.index = index;
            true
        } else {
            false
        }
    }

    /// Focus the next record; false at the end
    pub fn next(&mut self) -> bool {
        self.select(self.index + 1)
    }

    /// Focus the previous record; false at the start
    pub fn prev(&mut self) -> bool {
        match self.index.checked_sub(1) {
            Some(index) => self.select(index),
            None => false,
        }
    }

    /// Flip the mark on the focused record.
    ///
    /// Returns the new mark state, or None once completed.
    pub fn toggle_mark(&mut self) -> Option<bool> {
        if self.is_completed() {
            return None;
        }
        if self.marked.remove(&self.index) {
            Some(false)
        } else {
            self.marked.insert(self.index);
            Some(true)
        }
    }

    /// Mark every record whose bytes were verified identical; returns how many
    /// marks were added
    pub fn mark_identical(&mut self) -> usize {
        let before = self.marked.len();
        for (i, record) in self.records.iter().enumerate() {
            if record.verdict == IdentityVerdict::Identical {
                self.marked.insert(i);
            }
        }
        self.marked.len() - before
    }

    /// Overwrite the focused record's existing file with its source, then drop
    /// the record. Ok(None) once completed.
    pub fn replace_immediate(&mut self) -> Result<Option<DuplicateRecord>, ReconcileError> {
        let Some(record) = self.current() else {
            return Ok(None);
        };

        ensure_distinct(record)?;
        copy_with_times(&record.source, &record.existing).map_err(|source| {
            ReconcileError::Replace {
                source_path: record.source.clone(),
                existing: record.existing.clone(),
                source,
            }
        })?;

        info!(
            source = %record.source.display(),
            existing = %record.existing.display(),
            "Replaced existing file"
        );
        self.replaced += 1;
        Ok(Some(self.remove_at(self.index)))
    }

    /// Delete the focused record's source, keeping the existing file, then
    /// drop the record. Ok(None) once completed.
    pub fn delete_source_immediate(&mut self) -> Result<Option<DuplicateRecord>, ReconcileError> {
        let Some(record) = self.current() else {
            return Ok(None);
        };

        ensure_distinct(record)?;
        fs::remove_file(&record.source).map_err(|source| ReconcileError::Delete {
            path: record.source.clone(),
            source,
        })?;

        info!(source = %record.source.display(), "Deleted duplicate source");
        self.deleted += 1;
        Ok(Some(self.remove_at(self.index)))
    }

    /// Delete the source of every marked record, highest index first.
    ///
    /// Records whose deletion fails stay in the list. Marks are cleared either
    /// way. Returns the number of files deleted.
    pub fn commit_marked_deletions(&mut self) -> usize {
        let targets: Vec<usize> = self.marked.iter().rev().copied().collect();
        let mut count = 0;

        for idx in targets {
            let Some(record) = self.records.get(idx) else {
                continue;
            };
            if let Err(e) = ensure_distinct(record) {
                warn!("{}", e);
                continue;
            }
            match fs::remove_file(&record.source) {
                Ok(()) => {
                    info!(source = %record.source.display(), "Deleted duplicate source");
                    self.remove_at(idx);
                    count += 1;
                }
                Err(e) => {
                    warn!(
                        "{}",
                        ReconcileError::Delete {
                            path: record.source.clone(),
                            source: e,
                        }
                    );
                }
            }
        }

        self.marked.clear();
        self.deleted += count;
        self.revision += 1;
        count
    }

    /// `Duplicate i of n`, or `No duplicates remaining`
    pub fn status_line(&self) -> String {
        if self.is_completed() {
            "No duplicates remaining".to_string()
        } else {
            format!("Duplicate {} of {}", self.index + 1, self.records.len())
        }
    }

    pub fn summary(&self) -> ReconcileSummary {
        ReconcileSummary {
            replaced: self.replaced,
            deleted: self.deleted,
            remaining: self.records.len(),
        }
    }

    /// Token for the focused record in the current list revision
    pub fn preview_token(&self) -> PreviewToken {
        PreviewToken {
            index: self.index,
            revision: self.revision,
        }
    }

    /// Remove one record, renumber marks above it and keep focus in bounds
    fn remove_at(&mut self, idx: usize) -> DuplicateRecord {
        let record = self.records.remove(idx);

        self.marked = self
            .marked
            .iter()
            .filter(|&&m| m != idx)
            .map(|&m| if m > idx { m - 1 } else { m })
            .collect();

        if idx < self.index {
            self.index -= 1;
        }
        if self.index >= self.records.len() {
            self.index = self.records.len().saturating_sub(1);
        }
        self.revision += 1;
        record
    }
}

/// Refuse to act on a record whose source and existing file are one file
fn ensure_distinct(record: &DuplicateRecord) -> Result<(), ReconcileError> {
    if same_file(&record.source, &record.existing) {
        return Err(ReconcileError::SameFile {
            path: record.source.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn record(dir: &Path, name: &str, verdict: IdentityVerdict) -> DuplicateRecord {
        let source = dir.join("src").join(name);
        let existing = dir.join("dest").join(name);
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&source, format!("source {}", name)).unwrap();
        fs::write(&existing, format!("existing {}", name)).unwrap();
        DuplicateRecord {
            source,
            existing,
            verdict,
        }
    }

    fn reconciler(dir: &TempDir, names: &[&str]) -> Reconciler {
        Reconciler::new(
            names
                .iter()
                .map(|n| record(dir.path(), n, IdentityVerdict::Unknown))
                .collect(),
        )
    }

    #[test]
    fn empty_list_is_completed() {
        let mut r = Reconciler::new(Vec::new());
        assert_eq!(r.state(), ReviewState::Completed);
        assert_eq!(r.status_line(), "No duplicates remaining");
        assert_eq!(r.toggle_mark(), None);
        assert!(r.replace_immediate().unwrap().is_none());
        assert!(r.delete_source_immediate().unwrap().is_none());
        assert_eq!(r.commit_marked_deletions(), 0);
    }

    #[test]
    fn navigation_is_clamped() {
        let dir = TempDir::new().unwrap();
        let mut r = reconciler(&dir, &["a.jpg", "b.jpg"]);

        assert!(!r.prev());
        assert!(r.next());
        assert_eq!(r.status_line(), "Duplicate 2 of 2");
        assert!(!r.next());
        assert_eq!(r.index(), 1);
        assert!(!r.select(5));
        assert!(r.select(0));
        assert_eq!(r.state(), ReviewState::Reviewing { index: 0 });
    }

    #[test]
    fn toggle_mark_flips() {
        let dir = TempDir::new().unwrap();
        let mut r = reconciler(&dir, &["a.jpg"]);
        assert_eq!(r.toggle_mark(), Some(true));
        assert!(r.is_marked(0));
        assert_eq!(r.toggle_mark(), Some(false));
        assert_eq!(r.marked_count(), 0);
    }

    #[test]
    fn replace_overwrites_existing_and_keeps_source() {
        let dir = TempDir::new().unwrap();
        let mut r = reconciler(&dir, &["a.jpg", "b.jpg"]);
        let first = r.records()[0].clone();

        let replaced = r.replace_immediate().unwrap().unwrap();

        assert_eq!(replaced, first);
        assert_eq!(fs::read_to_string(&first.existing).unwrap(), "source a.jpg");
        assert!(first.source.exists());
        assert_eq!(r.len(), 1);
        assert_eq!(r.summary().replaced, 1);
    }

    #[test]
    fn delete_source_keeps_existing() {
        let dir = TempDir::new().unwrap();
        let mut r = reconciler(&dir, &["a.jpg"]);
        let first = r.records()[0].clone();

        r.delete_source_immediate().unwrap();

        assert!(!first.source.exists());
        assert!(first.existing.exists());
        assert!(r.is_completed());
        assert_eq!(r.status_line(), "No duplicates remaining");
    }

    #[test]
    fn failed_replace_keeps_record() {
        let dir = TempDir::new().unwrap();
        let mut r = reconciler(&dir, &["a.jpg"]);
        fs::remove_file(&r.records()[0].source).unwrap();

        assert!(matches!(
            r.replace_immediate(),
            Err(ReconcileError::Replace { .. })
        ));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn commit_deletes_marked_sources_only() {
        let dir = TempDir::new().unwrap();
        let mut r = reconciler(&dir, &["a.jpg", "b.jpg", "c.jpg", "d.jpg"]);
        let records = r.records().to_vec();
        r.select(1);
        r.toggle_mark();
        r.select(3);
        r.toggle_mark();

        assert_eq!(r.commit_marked_deletions(), 2);

        assert!(!records[1].source.exists());
        assert!(!records[3].source.exists());
        assert!(records[0].source.exists());
        assert!(records[2].source.exists());
        assert!(records.iter().all(|rec| rec.existing.exists()));
        let left: Vec<&PathBuf> = r.records().iter().map(|rec| &rec.source).collect();
        assert_eq!(left, vec![&records[0].source, &records[2].source]);
        assert_eq!(r.marked_count(), 0);
        assert_eq!(r.index(), 1);
    }

    #[test]
    fn commit_retains_failures() {
        let dir = TempDir::new().unwrap();
        let mut r = reconciler(&dir, &["a.jpg", "b.jpg"]);
        fs::remove_file(&r.records()[0].source).unwrap();
        r.toggle_mark();
        r.next();
        r.toggle_mark();

        assert_eq!(r.commit_marked_deletions(), 1);
        assert_eq!(r.len(), 1);
        assert!(r.records()[0].source.ends_with("a.jpg"));
        assert_eq!(r.marked_count(), 0);
    }

    #[test]
    fn removal_renumbers_marks() {
        let dir = TempDir::new().unwrap();
        let mut r = reconciler(&dir, &["a.jpg", "b.jpg", "c.jpg"]);
        r.select(2);
        r.toggle_mark();
        r.select(0);

        r.delete_source_immediate().unwrap();

        assert_eq!(r.marked().collect::<Vec<_>>(), vec![1]);
        assert!(r.records()[1].source.ends_with("c.jpg"));
    }

    #[test]
    fn mark_identical_uses_verdicts() {
        let dir = TempDir::new().unwrap();
        let mut r = Reconciler::new(vec![
            record(dir.path(), "a.jpg", IdentityVerdict::Identical),
            record(dir.path(), "b.jpg", IdentityVerdict::Different),
            record(dir.path(), "c.jpg", IdentityVerdict::Identical),
        ]);

        assert_eq!(r.mark_identical(), 2);
        assert_eq!(r.marked().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(r.mark_identical(), 0);
    }

    #[test]
    fn preview_token_changes_with_list() {
        let dir = TempDir::new().unwrap();
        let mut r = reconciler(&dir, &["a.jpg", "b.jpg", "c.jpg"]);
        r.select(2);
        let before = r.preview_token();

        r.select(0);
        r.delete_source_immediate().unwrap();
        r.select(1);

        assert_eq!(r.current().unwrap().source, r.records()[1].source);
        assert_ne!(r.preview_token(), before);
    }

    #[test]
    fn self_collision_is_never_deleted_or_replaced() {
        let dir = TempDir::new().unwrap();
        let only = dir.path().join("out").join("a.png");
        fs::create_dir_all(only.parent().unwrap()).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(&only, b"only copy").unwrap();
        let same = DuplicateRecord {
            source: only.clone(),
            existing: dir.path().join("sub/../out/a.png"),
            verdict: IdentityVerdict::Identical,
        };
        let other = record(dir.path(), "b.png", IdentityVerdict::Identical);
        let mut r = Reconciler::new(vec![same, other]);

        assert_eq!(r.mark_identical(), 2);
        assert_eq!(r.commit_marked_deletions(), 1);
        assert_eq!(r.len(), 1);
        assert_eq!(fs::read(&only).unwrap(), b"only copy");

        assert!(matches!(
            r.delete_source_immediate(),
            Err(ReconcileError::SameFile { .. })
        ));
        assert!(matches!(
            r.replace_immediate(),
            Err(ReconcileError::SameFile { .. })
        ));
        assert_eq!(fs::read(&only).unwrap(), b"only copy");
    }
}

//! Background loading of file details for the focused duplicate.

use super::PreviewToken;
use crate::core::metadata::{camera_display, ImageMetadataReader};
use crate::core::pipeline::DuplicateRecord;
use chrono::{DateTime, Local};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

const PREVIEW_THREAD_NAME: &str = "media-organizer-preview";

/// What the review screen shows about one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDetails {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
    pub dimensions: Option<(u32, u32)>,
    pub camera: Option<String>,
}

impl FileDetails {
    /// Gather details; only a missing or unreadable file is an error
    pub fn load(path: &Path, reader: &dyn ImageMetadataReader) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
            dimensions: image::image_dimensions(path).ok(),
            camera: reader.read_tags(path).as_ref().and_then(camera_display),
        })
    }
}

/// Details for both files of one record
#[derive(Debug, Clone)]
pub struct RecordPreview {
    pub token: PreviewToken,
    pub source: Result<FileDetails, String>,
    pub existing: Result<FileDetails, String>,
}

struct PreviewRequest {
    token: PreviewToken,
    source: PathBuf,
    existing: PathBuf,
}

/// Loads previews off the interactive thread.
///
/// Results carry the token they were requested with; `poll` and `wait`
/// return only results matching the caller's current token.
pub struct PreviewLoader {
    requests: Option<Sender<PreviewRequest>>,
    results: Receiver<RecordPreview>,
    handle: Option<JoinHandle<()>>,
}

impl PreviewLoader {
    pub fn new(reader: Arc<dyn ImageMetadataReader>) -> io::Result<Self> {
        let (request_tx, request_rx) = unbounded::<PreviewRequest>();
        let (result_tx, result_rx) = unbounded();

        let handle = thread::Builder::new()
            .name(PREVIEW_THREAD_NAME.to_string())
            .spawn(move || {
                for request in request_rx.iter() {
                    let load = |path: &Path| {
                        FileDetails::load(path, reader.as_ref())
                            .map_err(|e| format!("{}: {}", path.display(), e))
                    };
                    let preview = RecordPreview {
                        token: request.token,
                        source: load(&request.source),
                        existing: load(&request.existing),
                    };
                    if result_tx.send(preview).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            handle: Some(handle),
        })
    }

    /// Queue a load for `record`, tagged with `token`
    pub fn request(&self, token: PreviewToken, record: &DuplicateRecord) {
        if let Some(requests) = &self.requests {
            let _ = requests.send(PreviewRequest {
                token,
                source: record.source.clone(),
                existing: record.existing.clone(),
            });
        }
    }

    /// Newest finished preview for `current`, without blocking
    pub fn poll(&self, current: PreviewToken) -> Option<RecordPreview> {
        let mut latest = None;
        for preview in self.results.try_iter() {
            if preview.token == current {
                latest = Some(preview);
            } else {
                debug!(token = ?preview.token, current = ?current, "Discarding stale preview");
            }
        }
        latest
    }

    /// Wait up to `timeout` for the preview matching `current`
    pub fn wait(&self, current: PreviewToken, timeout: Duration) -> Option<RecordPreview> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(preview) if preview.token == current => return Some(preview),
                Ok(preview) => {
                    debug!(token = ?preview.token, current = ?current, "Discarding stale preview");
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

impl Drop for PreviewLoader {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

//! Event type definitions for progress reporting.

use crate::core::pipeline::BatchResult;
use serde::{Deserialize, Serialize};

/// Everything a batch worker reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Periodic progress
    Progress(BatchProgress),
    /// The batch finished (possibly cancelled); always the last event
    Completed(Box<BatchResult>),
    /// The batch could not run; always the last event
    Failed { message: String },
}

impl Event {
    /// True for the event that ends a worker's stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Completed(_) | Event::Failed { .. })
    }
}

/// Progress information during a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Files handled so far
    pub processed: usize,
    /// Files found by the scan
    pub total: usize,
    /// Human-readable status
    pub status: String,
}

impl BatchProgress {
    pub fn new(processed: usize, total: usize, status: impl Into<String>) -> Self {
        Self {
            processed,
            total,
            status: status.into(),
        }
    }

    /// Completion percentage (0-100)
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.processed as f64 / self.total as f64) * 100.0
        }
    }
}

//! # Pipeline Module
//!
//! Orchestrates one batch end to end.
//!
//! ## Pipeline Stages
//! 1. **Pre-flight** - source must be a directory, destination must be writable
//! 2. **Scan** - Discover all media files under the source root
//! 3. **Per file** - validate, resolve date, transfer
//! 4. **Report** - Write invalid / success / duplicate reports
//!
//! Files are processed one at a time, so outcome lists follow scan order.
//! `spawn_worker` runs a batch on its own thread and reports through events.

mod executor;
mod result;

pub use executor::{
    spawn_worker, CancellationToken, Pipeline, PipelineBuilder, PipelineConfig, STARTING_STATUS,
};
pub use result::{BatchResult, DuplicateRecord, FailureRecord, SuccessRecord};

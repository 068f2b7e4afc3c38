//! # Media Organizer
//!
//! Sorts a tree of photos and videos into a `YYYY/MM/DD` destination layout.
//!
//! ## Core Philosophy
//! - **Never overwrite** - a destination that already exists is reported as a duplicate
//! - **Never lose a file** - a move only removes the source once the destination is in place
//! - **Explain every file** - each scanned file ends with exactly one outcome
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - Scanning, validation, date resolution, transfer and reconciliation
//! - `events` - Event-driven progress reporting from a worker thread
//! - `config` - File and CLI configuration
//! - `error` - Error types with paths and readable messages
//! - `cli` - Command-line interface (binary only)

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{OrganizerError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. The filter is read
/// from `RUST_LOG`, falling back to `default_filter`. Calling it twice is a no-op.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

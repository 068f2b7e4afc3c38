//! # Core Module
//!
//! The UI-agnostic organizing engine.
//!
//! ## Modules
//! - `scanner` - Discovers photos and videos in a directory tree
//! - `metadata` - Reads embedded EXIF tags from images
//! - `probe` - Asks an external prober about video containers
//! - `validator` - Rejects files that cannot be decoded
//! - `date` - Resolves one timestamp per file through a fallback chain
//! - `transfer` - Derives destinations, detects collisions, copies or moves
//! - `pipeline` - Drives the whole batch and aggregates outcomes
//! - `reporter` - Writes plain-text reports of a batch
//! - `reconcile` - Walks duplicate collisions and applies operator decisions

pub mod date;
pub mod metadata;
pub mod pipeline;
pub mod probe;
pub mod reconcile;
pub mod reporter;
pub mod scanner;
pub mod transfer;
pub mod validator;

// Re-export commonly used types
pub use date::{DateResolver, DateSource, ResolvedDate};
pub use pipeline::{BatchResult, DuplicateRecord, Pipeline};
pub use reconcile::Reconciler;
pub use scanner::{MediaFile, MediaKind};
pub use transfer::{IdentityVerdict, OperationMode, TransferOutcome};

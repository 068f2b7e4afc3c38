//! # Validator Module
//!
//! Verifies a file is structurally usable before any date or transfer work.
//!
//! - Images must decode down to the last pixel, not merely open.
//! - Videos must report at least one decodable video stream to the probe.
//!
//! A missing probe tool is reported as its own error so it is never mistaken
//! for a corrupt file. Validation never writes anything.

mod decode;

pub use decode::PixelDecoder;

use crate::core::probe::VideoProbe;
use crate::core::scanner::MediaKind;
use crate::error::ValidationError;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Checks that media files can actually be read
#[derive(Clone)]
pub struct MediaValidator {
    probe: Arc<dyn VideoProbe>,
}

impl MediaValidator {
    /// Create a validator that probes videos with `probe`
    pub fn new(probe: Arc<dyn VideoProbe>) -> Self {
        Self { probe }
    }

    /// Ok if the file is usable, otherwise the reason it is not
    pub fn validate(&self, path: &Path, kind: MediaKind) -> Result<(), ValidationError> {
        let result = match kind {
            MediaKind::Image => PixelDecoder::decode(path).map(|(width, height)| {
                debug!(path = %path.display(), width, height, "Image decoded");
            }),
            MediaKind::Video => self
                .probe
                .verify_video_stream(path)
                .map_err(ValidationError::from),
        };

        if let Err(ref e) = result {
            warn!("{}", e);
        }
        result
    }
}

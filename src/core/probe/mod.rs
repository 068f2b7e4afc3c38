//! # Probe Module
//!
//! Video container inspection through an external prober.
//!
//! The organizer only needs two answers about a video: does it hold a
//! decodable video stream, and what container-level tags does it carry.
//! `VideoProbe` is that narrow contract; `FfprobeProbe` implements it with
//! `ffprobe`, and tests substitute their own implementation.

mod ffprobe;

pub use ffprobe::FfprobeProbe;

use crate::error::ProbeError;
use std::collections::HashMap;
use std::path::Path;

/// Container tags, keys as reported by the prober
pub type ContainerTags = HashMap<String, String>;

/// Capability to inspect video files
pub trait VideoProbe: Send + Sync {
    /// Succeeds only if at least one decodable video stream exists
    fn verify_video_stream(&self, path: &Path) -> Result<(), ProbeError>;

    /// Container-level (format) tags
    fn container_tags(&self, path: &Path) -> Result<ContainerTags, ProbeError>;
}

/// Look up a tag case-insensitively, treating spaces as underscores
pub fn find_tag<'a>(tags: &'a ContainerTags, key: &str) -> Option<&'a str> {
    let wanted = normalize_key(key);
    tags.iter()
        .find(|(k, _)| normalize_key(k) == wanted)
        .map(|(_, v)| v.as_str())
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_tag_ignores_case_and_spacing() {
        let tags = ContainerTags::from([(
            "Creation Time".to_string(),
            "2024-01-15T10:30:00Z".to_string(),
        )]);
        assert_eq!(
            find_tag(&tags, "creation_time"),
            Some("2024-01-15T10:30:00Z")
        );

        let tags = ContainerTags::from([(
            "CREATION_TIME".to_string(),
            "2023-06-01".to_string(),
        )]);
        assert_eq!(find_tag(&tags, "creation_time"), Some("2023-06-01"));
    }

    #[test]
    fn find_tag_missing_key() {
        let tags = ContainerTags::from([("encoder".to_string(), "Lavf".to_string())]);
        assert_eq!(find_tag(&tags, "creation_time"), None);
    }
}

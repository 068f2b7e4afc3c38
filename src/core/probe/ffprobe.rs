//! `VideoProbe` implementation that shells out to ffprobe.

use super::{ContainerTags, VideoProbe};
use crate::error::ProbeError;
use serde::Deserialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

#[cfg(windows)]
use std::os::windows::process::CommandExt;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// `-show_entries stream=codec_type` output
#[derive(Debug, Deserialize)]
struct StreamList {
    #[serde(default)]
    streams: Vec<StreamEntry>,
}

#[derive(Debug, Deserialize)]
struct StreamEntry {
    codec_type: Option<String>,
}

/// `-show_entries format_tags` output
#[derive(Debug, Default, Deserialize)]
struct FormatOutput {
    #[serde(default)]
    format: FormatSection,
}

#[derive(Debug, Default, Deserialize)]
struct FormatSection {
    #[serde(default)]
    tags: HashMap<String, serde_json::Value>,
}

/// Probes videos with the `ffprobe` binary
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
}

impl FfprobeProbe {
    /// Use the given ffprobe executable
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Whether the configured executable can be started at all
    pub fn is_available(&self) -> bool {
        self.command()
            .arg("-version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn command(&self) -> Command {
        #[cfg_attr(not(windows), allow(unused_mut))]
        let mut cmd = Command::new(&self.program);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);
        cmd
    }

    fn run(&self, path: &Path, args: &[&str]) -> Result<Output, ProbeError> {
        self.command()
            .args(args)
            .arg(path)
            .output()
            .map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    ProbeError::ToolMissing {
                        tool: self.program.display().to_string(),
                    }
                } else {
                    ProbeError::Io {
                        path: path.to_path_buf(),
                        source,
                    }
                }
            })
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl VideoProbe for FfprobeProbe {
    fn verify_video_stream(&self, path: &Path) -> Result<(), ProbeError> {
        let output = self.run(
            path,
            &[
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=codec_type",
                "-of",
                "json",
            ],
        )?;

        if !output.status.success() {
            return Err(ProbeError::Rejected {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if has_video_stream(path, &output.stdout)? {
            Ok(())
        } else {
            Err(ProbeError::NoVideoStream {
                path: path.to_path_buf(),
            })
        }
    }

    fn container_tags(&self, path: &Path) -> Result<ContainerTags, ProbeError> {
        let output = self.run(
            path,
            &["-v", "quiet", "-show_entries", "format_tags", "-of", "json"],
        )?;

        if !output.status.success() {
            debug!(path = %path.display(), "ffprobe could not read container tags");
            return Err(ProbeError::Rejected {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_format_tags(path, &output.stdout)
    }
}

fn has_video_stream(path: &Path, stdout: &[u8]) -> Result<bool, ProbeError> {
    let list: StreamList = serde_json::from_slice(stdout).map_err(|e| ProbeError::Output {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(list
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref().map_or(true, |t| t == "video")))
}

fn parse_format_tags(path: &Path, stdout: &[u8]) -> Result<ContainerTags, ProbeError> {
    let output: FormatOutput = serde_json::from_slice(stdout).map_err(|e| ProbeError::Output {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(output
        .format
        .tags
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}

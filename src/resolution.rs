//! Resolution extraction from in-memory video bytes.
//!
//! The decoder is an external `ffprobe` process, which only reads from a
//! file path. Incoming bytes are spilled to a per-call unique scratch file
//! that is removed on every exit path, success or failure.

use async_trait::async_trait;
use std::fmt;
use std::io::Write;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Errors that can occur during resolution extraction
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The decoder could not open or parse the video stream.
    #[error("Failed to decode video: {0}")]
    Probe(String),

    /// The decoder produced dimensions that cannot belong to a real video.
    #[error("Decoder reported invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// The scratch file for the decoder could not be created or written.
    #[error("Scratch file error: {0}")]
    Scratch(String),
}

/// Pixel dimensions of a decoded video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Decodes raw video bytes to their pixel resolution
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResolutionExtractor: Send + Sync {
    /// Extract the width and height of the first video stream.
    ///
    /// Deterministic: identical input bytes yield identical output.
    async fn extract(&self, video_bytes: &[u8]) -> Result<Resolution, DecodeError>;
}

/// Resolution extractor backed by an `ffprobe` subprocess
pub struct FfprobeExtractor {
    ffprobe_bin: String,
}

impl FfprobeExtractor {
    pub fn new() -> Self {
        Self {
            ffprobe_bin: "ffprobe".to_string(),
        }
    }

    /// Use a non-default `ffprobe` binary
    pub fn with_binary(ffprobe_bin: impl Into<String>) -> Self {
        Self {
            ffprobe_bin: ffprobe_bin.into(),
        }
    }
}

impl Default for FfprobeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResolutionExtractor for FfprobeExtractor {
    #[instrument(skip(self, video_bytes), fields(size_bytes = video_bytes.len()))]
    async fn extract(&self, video_bytes: &[u8]) -> Result<Resolution, DecodeError> {
        // NamedTempFile gives each call its own randomized path and deletes
        // it on drop, which covers every exit path below.
        let mut scratch = tempfile::Builder::new()
            .prefix("alert-video-")
            .tempfile()
            .map_err(|e| DecodeError::Scratch(e.to_string()))?;

        scratch
            .write_all(video_bytes)
            .and_then(|_| scratch.flush())
            .map_err(|e| DecodeError::Scratch(e.to_string()))?;

        let output = Command::new(&self.ffprobe_bin)
            .arg("-v")
            .arg("error")
            .arg("-select_streams")
            .arg("v:0")
            .arg("-show_entries")
            .arg("stream=width,height")
            .arg("-of")
            .arg("csv=p=0")
            .arg(scratch.path())
            .output()
            .await
            .map_err(|e| DecodeError::Probe(format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DecodeError::Probe(stderr));
        }

        let resolution = parse_dimensions(&String::from_utf8_lossy(&output.stdout))?;

        debug!(resolution = %resolution, "Resolution extracted");

        Ok(resolution)
    }
}

/// Parse `width,height` from ffprobe CSV output
fn parse_dimensions(output: &str) -> Result<Resolution, DecodeError> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| DecodeError::Probe("no video stream found".to_string()))?;

    let mut parts = line.trim_end_matches(',').splitn(2, ',');
    let width = parts
        .next()
        .and_then(|w| w.trim().parse::<u32>().ok())
        .ok_or_else(|| DecodeError::Probe(format!("unexpected probe output: {line}")))?;
    let height = parts
        .next()
        .and_then(|h| h.trim().parse::<u32>().ok())
        .ok_or_else(|| DecodeError::Probe(format!("unexpected probe output: {line}")))?;

    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidDimensions(format!("{width}x{height}")));
    }

    Ok(Resolution { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_display() {
        let resolution = Resolution {
            width: 1920,
            height: 1080,
        };
        assert_eq!(resolution.to_string(), "1920x1080");
    }

    #[test]
    fn test_parse_dimensions() {
        let resolution = parse_dimensions("1920,1080\n").unwrap();
        assert_eq!(
            resolution,
            Resolution {
                width: 1920,
                height: 1080
            }
        );
    }

    #[test]
    fn test_parse_dimensions_trailing_comma() {
        // Some ffprobe builds emit a trailing field separator.
        let resolution = parse_dimensions("640,480,\n").unwrap();
        assert_eq!(
            resolution,
            Resolution {
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn test_parse_dimensions_is_deterministic() {
        let first = parse_dimensions("1280,720\n").unwrap();
        let second = parse_dimensions("1280,720\n").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_rejects_zero_dimensions() {
        assert!(matches!(
            parse_dimensions("0,1080\n"),
            Err(DecodeError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_parse_rejects_empty_output() {
        assert!(matches!(
            parse_dimensions("\n"),
            Err(DecodeError::Probe(_))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_dimensions("not,numbers\n"),
            Err(DecodeError::Probe(_))
        ));
    }
}

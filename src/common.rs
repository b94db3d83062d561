//! Common types, utilities, and error handling for the segmenter.
//!
//! This module provides the foundational types used throughout the codebase:
//! the detected `Interval`, and the crate-wide error type.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A detected span of activity, in seconds from the start of the video
///
/// Intervals are immutable once constructed. `start` is always strictly less
/// than `end` and both are finite, which makes the derived ordering (by
/// `start`, then `end`) total in practice.
///
/// On disk an interval is a two-element array `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct Interval {
    start: f64,
    end: f64,
}

impl Interval {
    /// Create a new interval
    ///
    /// # Errors
    /// * `InvalidInterval` - if either bound is not finite or `start >= end`
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(SegmenterError::InvalidInterval { start, end });
        }
        if start >= end {
            return Err(SegmenterError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Start time in seconds (may be negative after pre-padding)
    pub fn start(&self) -> f64 {
        self.start
    }

    /// End time in seconds
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// End time in whole milliseconds, truncated toward zero
    pub fn end_ms(&self) -> i64 {
        (self.end * 1000.0) as i64
    }

    /// Same start, end pushed out to `end` if that is later
    pub fn extended_to(&self, end: f64) -> Interval {
        Interval {
            start: self.start,
            end: self.end.max(end),
        }
    }
}

impl TryFrom<[f64; 2]> for Interval {
    type Error = SegmenterError;

    fn try_from([start, end]: [f64; 2]) -> Result<Self> {
        Interval::new(start, end)
    }
}

impl From<Interval> for [f64; 2] {
    fn from(interval: Interval) -> Self {
        [interval.start, interval.end]
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}-{:.2}", self.start, self.end)
    }
}

/// All possible errors from the segmentation system
///
/// Absence of a side-file and an unusable frame source are deliberately not
/// represented here: the first loads as an empty list, the second is reported
/// through `Termination::SourceUnavailable`.
#[derive(Debug, thiserror::Error)]
pub enum SegmenterError {
    #[error("Failed to open video file: {path}")]
    VideoOpenFailed { path: String },

    #[error("Video file not found: {path}")]
    VideoNotFound { path: String },

    #[error("OpenCV error: {0}")]
    OpenCvError(#[from] opencv::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid interval: start={start}, end={end}")]
    InvalidInterval { start: f64, end: f64 },

    #[error("Frame read failed at frame {frame}: {reason}")]
    FrameReadFailed { frame: u64, reason: String },

    #[error("Seek to {target_ms}ms failed: {reason}")]
    SeekFailed { target_ms: f64, reason: String },

    #[error("Presence predicate failed at {timestamp_ms}ms: {reason}")]
    PredicateFailed { timestamp_ms: i64, reason: String },

    #[error("Extraction failed for {output}: {reason}")]
    ExtractionFailed { output: PathBuf, reason: String },

    #[error("FFmpeg not found: {0}")]
    FfmpegNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SegmenterError {
    /// Create a configuration error with a descriptive message
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    /// Create a presence predicate error
    pub fn predicate_error(timestamp_ms: i64, reason: impl Into<String>) -> Self {
        Self::PredicateFailed {
            timestamp_ms,
            reason: reason.into(),
        }
    }

    /// Create a frame read error
    pub fn frame_error(frame: u64, reason: impl Into<String>) -> Self {
        Self::FrameReadFailed {
            frame,
            reason: reason.into(),
        }
    }
}

/// Convenient Result type for segmentation operations
pub type Result<T> = std::result::Result<T, SegmenterError>;

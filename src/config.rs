//! Configuration values threaded explicitly into the engine and pipeline.
//!
//! `ScanConfig` is everything the segmentation engine needs. `AppConfig`
//! wraps it together with paths, logging and batch switches, and can be
//! loaded from a JSON file where every field is optional.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::common::{Result, SegmenterError};
use crate::presence::{Corner, RegionOfInterest, SegmentationMode};

/// Settings for a single segmentation scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Target sampling rate; the actual cadence is `floor(video_fps / sample_fps)` frames
    pub sample_fps: f64,
    /// Seconds subtracted from the start of every detected interval
    pub pre_padding_seconds: f64,
    /// Seconds added to the end of every detected interval
    pub post_padding_seconds: f64,
    /// Stop scanning once this many intervals exist
    pub max_intervals: usize,
    /// Persist progress whenever the interval count is a multiple of this
    pub checkpoint_interval: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            sample_fps: 12.0,
            pre_padding_seconds: 5.0,
            post_padding_seconds: 5.0,
            max_intervals: 10_000,
            checkpoint_interval: 10,
        }
    }
}

impl ScanConfig {
    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.sample_fps.is_finite() || self.sample_fps <= 0.0 {
            return Err(SegmenterError::config_error(format!(
                "sample_fps must be positive, got {}",
                self.sample_fps
            )));
        }
        for padding in [self.pre_padding_seconds, self.post_padding_seconds] {
            if !padding.is_finite() || padding < 0.0 {
                return Err(SegmenterError::config_error(format!(
                    "padding must be a non-negative number, got {}",
                    padding
                )));
            }
        }
        if self.max_intervals == 0 {
            return Err(SegmenterError::config_error("max_intervals must be at least 1"));
        }
        if self.checkpoint_interval == 0 {
            return Err(SegmenterError::config_error(
                "checkpoint_interval must be at least 1",
            ));
        }
        Ok(())
    }

    /// Frames to advance between predicate calls for a video at `video_fps`
    pub fn frame_step(&self, video_fps: f64) -> u64 {
        ((video_fps / self.sample_fps).floor() as u64).max(1)
    }
}

/// Thresholds for the pose checklist predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkCriteria {
    /// Landmark indices of which at least one must pass both thresholds
    pub checklist: Vec<usize>,
    pub min_visibility: f32,
    pub min_presence: f32,
}

impl Default for LandmarkCriteria {
    fn default() -> Self {
        Self {
            // wrists, pinkies, index fingers, thumbs
            checklist: (15..=22).collect(),
            min_visibility: 0.8,
            min_presence: 0.8,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// Also append log output to this file
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Process-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory scanned for input videos
    pub download_path: PathBuf,
    /// Root under which `<mode>/<video id>/` output directories are created
    pub segments_path: PathBuf,
    /// Accepted input extensions, compared case-insensitively
    pub video_extensions: Vec<String>,
    /// Maximum number of videos handled per batch
    pub video_limit: usize,
    pub perform_segmentation: bool,
    pub cut_segments: bool,
    /// Explicit ffmpeg binary; looked up on PATH when absent
    pub ffmpeg_path: Option<PathBuf>,
    pub mode: SegmentationMode,
    pub scan: ScanConfig,
    /// Consolidated intervals shorter than this are dropped
    pub min_segment_length: f64,
    pub roi: RegionOfInterest,
    pub landmarks: LandmarkCriteria,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_path: PathBuf::from("data/downloads"),
            segments_path: PathBuf::from("data/segments"),
            video_extensions: vec!["mp4".to_string(), "mkv".to_string(), "webm".to_string()],
            video_limit: 1,
            perform_segmentation: true,
            cut_segments: true,
            ffmpeg_path: None,
            mode: SegmentationMode::Pose,
            scan: ScanConfig::default(),
            min_segment_length: 2.0,
            roi: RegionOfInterest::new(0.25, 0.45, Corner::BottomRight),
            landmarks: LandmarkCriteria::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file; missing fields take defaults
    #[instrument]
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());

        let text = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&text)?;
        config.validate()?;

        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.scan.validate()?;
        self.roi.validate()?;

        if self.min_segment_length < 0.0 || !self.min_segment_length.is_finite() {
            return Err(SegmenterError::config_error(
                "min_segment_length must be a non-negative number",
            ));
        }
        if self.video_limit == 0 {
            return Err(SegmenterError::config_error("video_limit must be at least 1"));
        }
        if self.video_extensions.is_empty() {
            return Err(SegmenterError::config_error(
                "at least one video extension is required",
            ));
        }
        Ok(())
    }

    /// Output directory for a given video identity
    pub fn video_output_dir(&self, video_id: &str) -> PathBuf {
        self.segments_path.join(self.mode.as_str()).join(video_id)
    }
}

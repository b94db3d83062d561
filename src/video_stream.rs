//! Video stream handling using OpenCV backend
//!
//! This module wraps OpenCV's VideoCapture as a `FrameSource`. Opening only
//! fails when the file is missing or cannot be decoded at all; metadata
//! sanity (frame count, FPS) is judged by the segmentation engine so that an
//! unusable video is reported instead of aborting a batch.

use opencv::{core::Mat, prelude::*, videoio};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::common::{Result, SegmenterError};
use crate::frame_source::FrameSource;

/// Wrapper around OpenCV VideoCapture for sequential, seekable reading
pub struct VideoStream {
    cap: videoio::VideoCapture,
    fps: f64,
    frame_count: i64,
    width: i32,
    height: i32,
    path: String,
}

impl VideoStream {
    /// Open a video file for reading
    ///
    /// # Errors
    /// * `VideoNotFound` - If the file doesn't exist
    /// * `VideoOpenFailed` - If OpenCV can't open the file
    #[instrument(skip(path))]
    pub fn open(path: &str) -> Result<Self> {
        info!("Opening video stream: {}", path);

        if !Path::new(path).is_file() {
            return Err(SegmenterError::VideoNotFound {
                path: path.to_string(),
            });
        }

        let cap = videoio::VideoCapture::from_file(path, videoio::CAP_ANY).map_err(|e| {
            warn!("Failed to create VideoCapture: {}", e);
            SegmenterError::VideoOpenFailed {
                path: path.to_string(),
            }
        })?;

        if !cap.is_opened()? {
            return Err(SegmenterError::VideoOpenFailed {
                path: path.to_string(),
            });
        }

        let fps = cap.get(videoio::CAP_PROP_FPS)?;
        let frame_count = cap.get(videoio::CAP_PROP_FRAME_COUNT)? as i64;
        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

        info!(
            "Video opened - FPS: {}, Frames: {}, Size: {}x{}",
            fps, frame_count, width, height
        );

        Ok(Self {
            cap,
            fps,
            frame_count,
            width,
            height,
            path: path.to_string(),
        })
    }

    /// Get the video duration in seconds, 0 when metadata is unusable
    pub fn duration_seconds(&self) -> f64 {
        match (self.frame_count(), self.fps()) {
            (Some(frames), Some(fps)) => frames as f64 / fps,
            _ => 0.0,
        }
    }

    /// Summary of the stream metadata
    pub fn info(&self) -> VideoInfo {
        VideoInfo {
            path: self.path.clone(),
            fps: self.fps,
            frame_count: self.frame_count.max(0) as u64,
            width: self.width.max(0) as u32,
            height: self.height.max(0) as u32,
            duration_seconds: self.duration_seconds(),
        }
    }
}

impl FrameSource for VideoStream {
    type Frame = Mat;

    fn frame_count(&self) -> Option<u64> {
        (self.frame_count > 0).then_some(self.frame_count as u64)
    }

    fn fps(&self) -> Option<f64> {
        (self.fps.is_finite() && self.fps > 0.0).then_some(self.fps)
    }

    fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();

        let success = self.cap.read(&mut frame).map_err(|e| {
            let position = self.cap.get(videoio::CAP_PROP_POS_FRAMES).unwrap_or(0.0);
            SegmenterError::frame_error(position as u64, format!("OpenCV read failed: {}", e))
        })?;

        if success && !frame.empty() {
            Ok(Some(frame))
        } else {
            debug!("Reached end of {}", self.path);
            Ok(None)
        }
    }

    fn position_ms(&self) -> Result<f64> {
        Ok(self.cap.get(videoio::CAP_PROP_POS_MSEC)?)
    }

    /// # Errors
    /// * `SeekFailed` - If the backend does not support seeking this stream
    #[instrument(skip(self))]
    fn seek_ms(&mut self, ms: f64) -> Result<()> {
        if !self.cap.set(videoio::CAP_PROP_POS_MSEC, ms)? {
            warn!("Backend rejected seek to {}ms in {}", ms, self.path);
            return Err(SegmenterError::SeekFailed {
                target_ms: ms,
                reason: format!("backend rejected the seek in {}", self.path),
            });
        }
        debug!("Seeked to {}ms", ms);
        Ok(())
    }
}

// Implement Debug manually to avoid showing internal OpenCV state
impl std::fmt::Debug for VideoStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoStream")
            .field("path", &self.path)
            .field("fps", &self.fps)
            .field("frame_count", &self.frame_count)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Video metadata information
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub path: String,
    pub fps: f64,
    pub frame_count: u64,
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
}

impl VideoInfo {
    /// Get a human-readable description of the video
    pub fn description(&self) -> String {
        format!(
            "{}x{} at {:.2}fps, {} frames ({:.1}s duration)",
            self.width, self.height, self.fps, self.frame_count, self.duration_seconds
        )
    }

    /// Whether the engine can scan a video with this metadata
    pub fn is_scannable(&self) -> bool {
        self.fps > 0.0 && self.frame_count > 0
    }
}

/// Get video information without scanning it
#[instrument]
pub fn get_video_info(video_path: &str) -> Result<VideoInfo> {
    Ok(VideoStream::open(video_path)?.info())
}

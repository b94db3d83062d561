//! Synthetic frame sources and checkpoint sinks shared by the integration tests.

#![allow(dead_code)]

use activity_segmenter::{Checkpoint, FrameSource, Interval, Result, ScanConfig};

/// Frames are their own 1-based frame numbers; position follows OpenCV's
/// convention of reporting the time just after the last frame read.
pub struct SyntheticVideo {
    pub total: u64,
    pub fps: f64,
    pub position: u64,
    pub seeks: Vec<f64>,
    /// Accept seeks without moving, like a backend that cannot seek
    pub ignores_seek: bool,
}

impl SyntheticVideo {
    pub fn new(total: u64, fps: f64) -> Self {
        Self {
            total,
            fps,
            position: 0,
            seeks: Vec::new(),
            ignores_seek: false,
        }
    }
}

impl FrameSource for SyntheticVideo {
    type Frame = u64;

    fn frame_count(&self) -> Option<u64> {
        (self.total > 0).then_some(self.total)
    }

    fn fps(&self) -> Option<f64> {
        (self.fps > 0.0).then_some(self.fps)
    }

    fn read_frame(&mut self) -> Result<Option<u64>> {
        if self.position >= self.total {
            return Ok(None);
        }
        self.position += 1;
        Ok(Some(self.position))
    }

    fn position_ms(&self) -> Result<f64> {
        Ok(self.position as f64 * 1000.0 / self.fps)
    }

    fn seek_ms(&mut self, ms: f64) -> Result<()> {
        self.seeks.push(ms);
        if self.ignores_seek {
            return Ok(());
        }
        self.position = ((ms * self.fps / 1000.0).round() as u64).min(self.total);
        Ok(())
    }
}

/// Keeps every checkpointed list
#[derive(Default)]
pub struct RecordingCheckpoint {
    pub snapshots: Vec<Vec<Interval>>,
}

impl Checkpoint for RecordingCheckpoint {
    fn checkpoint(&mut self, intervals: &[Interval]) -> Result<()> {
        self.snapshots.push(intervals.to_vec());
        Ok(())
    }
}

pub fn scan_config(sample_fps: f64, pre: f64, post: f64) -> ScanConfig {
    ScanConfig {
        sample_fps,
        pre_padding_seconds: pre,
        post_padding_seconds: post,
        max_intervals: 1000,
        checkpoint_interval: 1,
    }
}

/// Predicate that is true for frames inside any of `windows` (inclusive)
pub fn windows(windows: Vec<(u64, u64)>) -> impl FnMut(&u64, i64) -> Result<bool> {
    move |frame: &u64, _timestamp_ms: i64| {
        Ok(windows
            .iter()
            .any(|&(first, last)| (first..=last).contains(frame)))
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

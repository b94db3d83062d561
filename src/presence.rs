//! Presence predicates: "is the tracked activity happening in this frame?"
//!
//! The segmentation engine only knows the `PresencePredicate` capability.
//! Landmark inference itself lives behind `LandmarkDetector`; this module
//! turns detector output into a boolean (pose checklist or any-hand) and
//! optionally narrows the frame to a corner region before detection.

use opencv::{
    core::{Mat, Rect},
    imgproc,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::common::{Result, SegmenterError};
use crate::config::LandmarkCriteria;

/// Boolean classifier over a single frame and its timestamp
///
/// Implementations may keep temporal state between calls of one scan, but a
/// fresh predicate must be used for every video.
pub trait PresencePredicate<F> {
    fn is_present(&mut self, frame: &F, timestamp_ms: i64) -> Result<bool>;
}

impl<F, T> PresencePredicate<F> for T
where
    T: FnMut(&F, i64) -> Result<bool>,
{
    fn is_present(&mut self, frame: &F, timestamp_ms: i64) -> Result<bool> {
        self(frame, timestamp_ms)
    }
}

/// Which kind of landmark model drives the segmentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationMode {
    /// Body pose model, present when a hand-related landmark is confidently visible
    #[default]
    Pose,
    /// Hand model, present when any hand is detected
    Hand,
}

impl SegmentationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentationMode::Pose => "pose",
            SegmentationMode::Hand => "hand",
        }
    }
}

impl std::str::FromStr for SegmentationMode {
    type Err = SegmenterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pose" => Ok(SegmentationMode::Pose),
            "hand" => Ok(SegmentationMode::Hand),
            other => Err(SegmenterError::config_error(format!(
                "unknown segmentation mode '{}', expected pose|hand",
                other
            ))),
        }
    }
}

/// A single landmark reported by a detector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
    pub presence: f32,
}

/// Landmark model boundary
///
/// Returns the landmarks of the first detected subject, or an empty list
/// when nothing was detected in the frame.
pub trait LandmarkDetector<F> {
    fn detect(&mut self, frame: &F, timestamp_ms: i64) -> Result<Vec<Landmark>>;
}

/// Present when any checklist landmark passes both confidence thresholds
#[derive(Debug)]
pub struct PoseChecklist<D> {
    detector: D,
    criteria: LandmarkCriteria,
}

impl<D> PoseChecklist<D> {
    pub fn new(detector: D, criteria: LandmarkCriteria) -> Self {
        Self { detector, criteria }
    }

    /// Evaluate the checklist against one subject's landmarks
    pub fn matches(&self, landmarks: &[Landmark], timestamp_ms: i64) -> Result<bool> {
        if landmarks.is_empty() {
            return Ok(false);
        }

        let mut found = false;
        for &index in &self.criteria.checklist {
            let landmark = landmarks.get(index).ok_or_else(|| {
                SegmenterError::predicate_error(
                    timestamp_ms,
                    format!(
                        "checklist landmark {} missing, detector returned {}",
                        index,
                        landmarks.len()
                    ),
                )
            })?;

            if landmark.visibility >= self.criteria.min_visibility
                && landmark.presence >= self.criteria.min_presence
            {
                found = true;
            }
        }
        Ok(found)
    }
}

impl<F, D: LandmarkDetector<F>> PresencePredicate<F> for PoseChecklist<D> {
    fn is_present(&mut self, frame: &F, timestamp_ms: i64) -> Result<bool> {
        let landmarks = self.detector.detect(frame, timestamp_ms)?;
        let present = self.matches(&landmarks, timestamp_ms)?;
        trace!("Pose at {}ms: {} landmarks, present={}", timestamp_ms, landmarks.len(), present);
        Ok(present)
    }
}

/// Present whenever the detector reports anything
#[derive(Debug)]
pub struct AnyLandmarks<D> {
    detector: D,
}

impl<D> AnyLandmarks<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }
}

impl<F, D: LandmarkDetector<F>> PresencePredicate<F> for AnyLandmarks<D> {
    fn is_present(&mut self, frame: &F, timestamp_ms: i64) -> Result<bool> {
        Ok(!self.detector.detect(frame, timestamp_ms)?.is_empty())
    }
}

/// Frame corner a region of interest is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    fn anchor(&self) -> (i32, i32) {
        match self {
            Corner::TopLeft => (0, 0),
            Corner::TopRight => (1, 0),
            Corner::BottomLeft => (0, 1),
            Corner::BottomRight => (1, 1),
        }
    }
}

/// Corner-anchored sub-rectangle expressed as fractions of the frame size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub width_ratio: f64,
    pub height_ratio: f64,
    pub corner: Corner,
}

impl RegionOfInterest {
    pub fn new(width_ratio: f64, height_ratio: f64, corner: Corner) -> Self {
        Self {
            width_ratio,
            height_ratio,
            corner,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let in_range = |r: f64| r > 0.0 && r <= 1.0;
        if !in_range(self.width_ratio) || !in_range(self.height_ratio) {
            return Err(SegmenterError::config_error(format!(
                "ROI ratios must be in (0, 1], got {}x{}",
                self.width_ratio, self.height_ratio
            )));
        }
        Ok(())
    }

    /// Pixel rectangle of this region inside a `width` x `height` frame
    pub fn rect(&self, width: i32, height: i32) -> Rect {
        let roi_w = ((width as f64 * self.width_ratio) as i32).clamp(1, width.max(1));
        let roi_h = ((height as f64 * self.height_ratio) as i32).clamp(1, height.max(1));
        let (ax, ay) = self.corner.anchor();

        Rect::new(ax * (width - roi_w), ay * (height - roi_h), roi_w, roi_h)
    }

    /// Crop a BGR frame to this region and convert it to RGB
    #[instrument(skip(self, frame))]
    pub fn crop_rgb(&self, frame: &Mat) -> Result<Mat> {
        let rect = self.rect(frame.cols(), frame.rows());
        let region = Mat::roi(frame, rect)?;

        let mut rgb = Mat::default();
        imgproc::cvt_color_def(&region, &mut rgb, imgproc::COLOR_BGR2RGB)?;

        trace!("Cropped {}x{} frame to {:?}", frame.cols(), frame.rows(), rect);
        Ok(rgb)
    }
}

/// Runs the inner predicate on the region of interest of each frame
#[derive(Debug)]
pub struct Cropped<P> {
    roi: RegionOfInterest,
    inner: P,
}

impl<P> Cropped<P> {
    pub fn new(roi: RegionOfInterest, inner: P) -> Self {
        Self { roi, inner }
    }
}

impl<P: PresencePredicate<Mat>> PresencePredicate<Mat> for Cropped<P> {
    fn is_present(&mut self, frame: &Mat, timestamp_ms: i64) -> Result<bool> {
        let region = self.roi.crop_rgb(frame)?;
        self.inner.is_present(&region, timestamp_ms)
    }
}

/// Build the predicate for `mode` around a freshly created detector
pub fn landmark_predicate<D>(
    mode: SegmentationMode,
    detector: D,
    criteria: &LandmarkCriteria,
    roi: RegionOfInterest,
) -> Box<dyn PresencePredicate<Mat>>
where
    D: LandmarkDetector<Mat> + 'static,
{
    debug!("Building {} predicate with ROI {:?}", mode.as_str(), roi);
    match mode {
        SegmentationMode::Pose => Box::new(Cropped::new(
            roi,
            PoseChecklist::new(detector, criteria.clone()),
        )),
        SegmentationMode::Hand => Box::new(Cropped::new(roi, AnyLandmarks::new(detector))),
    }
}

//! Segmentation engine - presence runs to padded time intervals
//!
//! The engine walks a `FrameSource` frame by frame, asks the presence
//! predicate about every `frame_step`-th frame, and turns each run of
//! positive samples into an `Interval`:
//!
//! * `start = segment_start / fps - pre_padding`
//! * `end = closing_frame / fps + post_padding`
//!
//! where `closing_frame` is the first negative sample after the run, not the
//! last positive one. Runs still open when the scan stops are dropped.
//!
//! Progress is handed to a `Checkpoint` sink so that a later scan seeded with
//! the stored intervals can seek past them and keep appending.

use tracing::{debug, error, info, instrument, trace};

use crate::common::{Interval, Result, SegmenterError};
use crate::config::ScanConfig;
use crate::frame_source::FrameSource;
use crate::persistence::Checkpoint;
use crate::presence::PresencePredicate;

/// Why a scan stopped
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    /// The frame source ran out of frames
    EndOfStream,
    /// `max_intervals` intervals exist
    LimitReached,
    /// Frame count or FPS missing / not positive; nothing was scanned
    SourceUnavailable { reason: String },
}

/// Outcome of a scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    /// Known intervals followed by the newly detected ones
    pub intervals: Vec<Interval>,
    pub termination: Termination,
    /// Intervals detected by this scan
    pub new_intervals: usize,
    /// Frames read from the source
    pub frames_read: u64,
    /// Frames handed to the predicate
    pub frames_sampled: u64,
}

impl ScanReport {
    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            intervals: Vec::new(),
            termination: Termination::SourceUnavailable {
                reason: reason.into(),
            },
            new_intervals: 0,
            frames_read: 0,
            frames_sampled: 0,
        }
    }

    pub fn is_source_unavailable(&self) -> bool {
        matches!(self.termination, Termination::SourceUnavailable { .. })
    }
}

/// Transient position and open-run state of one scan
#[derive(Debug)]
struct ScanCursor {
    frame_count: u64,
    segment_start: Option<u64>,
    video_fps: f64,
    frame_step: u64,
}

impl ScanCursor {
    fn is_sampled(&self) -> bool {
        self.frame_count % self.frame_step == 0
    }

    /// Feed one sampled presence value, returning a closed run if any
    fn observe(&mut self, present: bool, config: &ScanConfig) -> Result<Option<Interval>> {
        match (present, self.segment_start) {
            (true, None) => {
                trace!("Run opened at frame {}", self.frame_count);
                self.segment_start = Some(self.frame_count);
                Ok(None)
            }
            (false, Some(start_frame)) => {
                let start = start_frame as f64 / self.video_fps - config.pre_padding_seconds;
                let end = self.frame_count as f64 / self.video_fps + config.post_padding_seconds;
                self.segment_start = None;
                Interval::new(start, end).map(Some)
            }
            _ => Ok(None),
        }
    }
}

/// Scan `source` for presence runs
///
/// `known_intervals` come from an interrupted earlier scan of the same video;
/// when non-empty the source is first sought to the end of the last one and
/// new intervals are appended after them.
///
/// # Arguments
/// * `source` - Frames to scan, positioned at the start
/// * `predicate` - Presence test for each sampled frame
/// * `known_intervals` - Intervals from an earlier, interrupted scan
/// * `config` - Sampling rate, padding, interval limit and checkpoint cadence
/// * `checkpoint` - Receives the full interval list whenever its length is a
///   multiple of `checkpoint_interval`
///
/// # Returns
/// A `ScanReport` with the known intervals followed by the new ones. A source
/// whose frame count or FPS is absent, zero, negative or not finite is not an
/// error: the report carries `Termination::SourceUnavailable` and no
/// intervals.
///
/// # Errors
/// * `InvalidConfig` - If `config` does not validate
/// * `SeekFailed` - If the resume seek is rejected or lands short of its target
/// * Any error from the predicate, the source or the checkpoint sink
#[instrument(skip_all, fields(known = known_intervals.len()))]
pub fn scan<S, P, C>(
    source: &mut S,
    predicate: &mut P,
    known_intervals: Vec<Interval>,
    config: &ScanConfig,
    checkpoint: &mut C,
) -> Result<ScanReport>
where
    S: FrameSource,
    P: PresencePredicate<S::Frame> + ?Sized,
    C: Checkpoint + ?Sized,
{
    config.validate()?;

    let total_frames = match source.frame_count() {
        Some(frames) if frames > 0 => frames,
        other => {
            error!("Frame source is unavailable: frame count is {:?}", other);
            return Ok(ScanReport::unavailable("frame count is missing or not positive"));
        }
    };
    let video_fps = match source.fps() {
        Some(fps) if fps.is_finite() && fps > 0.0 => fps,
        other => {
            error!("Frame source is unavailable: FPS is {:?}", other);
            return Ok(ScanReport::unavailable("FPS is missing or not positive"));
        }
    };

    let mut cursor = ScanCursor {
        frame_count: 0,
        segment_start: None,
        video_fps,
        frame_step: config.frame_step(video_fps),
    };
    debug!(
        "Video FPS: {}, sampling FPS: {}, frame step: {}",
        video_fps, config.sample_fps, cursor.frame_step
    );

    let mut intervals = known_intervals;
    let known = intervals.len();

    if let Some(last) = intervals.last() {
        let resume_ms = last.end_ms() as f64;
        source.seek_ms(resume_ms)?;
        let position_ms = source.position_ms()?;

        // Within one frame of the target, or of the end of the video when the
        // padded end lies past it
        let frame_ms = 1000.0 / video_fps;
        let reachable_ms = resume_ms.min(total_frames as f64 * frame_ms);
        if position_ms + frame_ms < reachable_ms {
            error!("Seek to {}ms landed at {}ms", resume_ms, position_ms);
            return Err(SegmenterError::SeekFailed {
                target_ms: resume_ms,
                reason: format!("stream is at {}ms", position_ms),
            });
        }

        // Keep frame indices absolute so resumed intervals are in video time
        cursor.frame_count = (position_ms * video_fps / 1000.0).round().max(0.0) as u64;
        info!(
            "Resuming after {} known intervals at {}ms (frame {})",
            known, resume_ms, cursor.frame_count
        );
    }

    let mut frames_read = 0u64;
    let mut frames_sampled = 0u64;

    let termination = loop {
        let frame = match source.read_frame()? {
            Some(frame) => frame,
            None => {
                info!("Reached end of video");
                break Termination::EndOfStream;
            }
        };

        frames_read += 1;
        cursor.frame_count += 1;
        if !cursor.is_sampled() {
            continue;
        }
        frames_sampled += 1;
        debug!("Processing frame {}/{}", cursor.frame_count, total_frames);

        let timestamp_ms = source.position_ms()? as i64;
        let present = predicate.is_present(&frame, timestamp_ms)?;

        if let Some(interval) = cursor.observe(present, config)? {
            intervals.push(interval);
            info!(
                "Segment {:04}: {:.2}-{:.2}, total {:.2} seconds",
                intervals.len(),
                interval.start(),
                interval.end(),
                interval.duration()
            );
        }

        if intervals.len() >= config.max_intervals {
            info!("Interval limit of {} reached", config.max_intervals);
            break Termination::LimitReached;
        }

        if intervals.len() % config.checkpoint_interval == 0 {
            checkpoint.checkpoint(&intervals)?;
        }
    };

    if let Some(open) = cursor.segment_start {
        debug!("Discarding run still open since frame {}", open);
    }

    let new_intervals = intervals.len() - known;
    info!(
        "Scan finished ({:?}): {} new intervals, {} total, {} frames read, {} sampled",
        termination,
        new_intervals,
        intervals.len(),
        frames_read,
        frames_sampled
    );

    Ok(ScanReport {
        intervals,
        termination,
        new_intervals,
        frames_read,
        frames_sampled,
    })
}

//! Per-video flow and the batch runner over a download directory.
//!
//! For every video: scan it (checkpointing the raw side-file), consolidate
//! the raw intervals into the consolidated side-file, then cut the
//! consolidated intervals into clips. One video is finished before the next
//! one starts, and a failure in one video never stops the batch.

use opencv::core::Mat;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

use crate::common::{Interval, Result};
use crate::config::{AppConfig, ScanConfig};
use crate::consolidate::consolidate;
use crate::extract::{extract_segments, FfmpegCutter, SegmentCutter};
use crate::frame_source::FrameSource;
use crate::persistence::IntervalFile;
use crate::presence::PresencePredicate;
use crate::segmenter::{scan, ScanReport};
use crate::video_stream::VideoStream;

/// Scan a source, resuming from and checkpointing to the raw side-file in `output_dir`
///
/// The full list is written once more when the scan ends. An unavailable
/// source leaves the side-file untouched.
///
/// # Arguments
/// * `source` - Frames of the video, positioned at the start
/// * `predicate` - Fresh presence predicate for this video
/// * `output_dir` - Existing directory holding the video's side-files
/// * `config` - Scan settings
///
/// # Returns
/// The scan report; its intervals are everything now stored in the raw side-file
///
/// # Errors
/// * `Json` - If the stored raw side-file is malformed
/// * `Io` - If a checkpoint or the final save cannot be written
/// * Any error from `scan`
#[instrument(skip(source, predicate, config))]
pub fn segment_video<S, P>(
    source: &mut S,
    predicate: &mut P,
    output_dir: &Path,
    config: &ScanConfig,
) -> Result<ScanReport>
where
    S: FrameSource,
    P: PresencePredicate<S::Frame> + ?Sized,
{
    let mut raw = IntervalFile::raw(output_dir);
    let known = raw.load()?;

    let report = scan(source, predicate, known, config, &mut raw)?;
    if !report.is_source_unavailable() {
        raw.save(&report.intervals)?;
    }
    Ok(report)
}

/// Open `video` with OpenCV and segment it
///
/// A video that cannot be opened is reported the same way as one with
/// unusable metadata.
#[instrument(skip(predicate, config))]
pub fn segment_video_file(
    video: &Path,
    predicate: &mut dyn PresencePredicate<Mat>,
    output_dir: &Path,
    config: &ScanConfig,
) -> Result<ScanReport> {
    let mut stream = match VideoStream::open(&video.to_string_lossy()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Cannot open {}: {}", video.display(), e);
            return Ok(ScanReport::unavailable(e.to_string()));
        }
    };
    segment_video(&mut stream, predicate, output_dir, config)
}

/// Rebuild the consolidated side-file from the raw one
#[instrument]
pub fn consolidate_video(output_dir: &Path, min_length: f64) -> Result<Vec<Interval>> {
    let raw = IntervalFile::raw(output_dir).load()?;
    let cleaned = consolidate(&raw, min_length);
    IntervalFile::consolidated(output_dir).save(&cleaned)?;
    Ok(cleaned)
}

/// Consolidated intervals for `output_dir`, computing them from the raw
/// side-file only when no consolidated list is stored yet
///
/// # Arguments
/// * `output_dir` - Directory holding the video's side-files
/// * `min_length` - Shortest consolidated interval to keep, in seconds
///
/// # Returns
/// The stored consolidated list if non-empty, otherwise the freshly
/// consolidated raw list (which is then stored). Empty when neither exists.
///
/// # Errors
/// * `Json` - If a side-file is malformed
/// * `Io` - If the consolidated side-file cannot be written
#[instrument]
pub fn postprocess(output_dir: &Path, min_length: f64) -> Result<Vec<Interval>> {
    let stored = IntervalFile::consolidated(output_dir).load()?;
    if !stored.is_empty() {
        return Ok(stored);
    }
    consolidate_video(output_dir, min_length)
}

/// Identity of a video: the part of its file stem before the first `" - "`
pub fn video_id(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.split_once(" - ") {
        Some((id, _)) => id.to_string(),
        None => stem,
    }
}

/// Regular files in `dir` with one of `extensions` (case-insensitive), sorted by path
pub fn discover_videos(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect();

    let mut videos = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .map(|ext| wanted.contains(&ext.to_string_lossy().to_lowercase()))
            .unwrap_or(false);
        if matches {
            videos.push(path);
        }
    }
    videos.sort();
    Ok(videos)
}

/// Creates a fresh presence predicate for each video
pub type PredicateFactory<'a> = dyn FnMut() -> Result<Box<dyn PresencePredicate<Mat>>> + 'a;

/// What happened to one video of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct VideoOutcome {
    pub video: PathBuf,
    pub video_id: String,
    pub intervals: Vec<Interval>,
    pub clips_written: usize,
    pub clip_failures: usize,
}

/// Totals of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<VideoOutcome>,
    /// Videos whose processing failed, with the error message
    pub failed: Vec<(PathBuf, String)>,
}

/// Runs the whole pipeline over the configured download directory
pub struct Batch<'a> {
    config: &'a AppConfig,
    predicates: Option<Box<PredicateFactory<'a>>>,
    cutter: Option<Box<dyn SegmentCutter + 'a>>,
}

impl<'a> Batch<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self {
            config,
            predicates: None,
            cutter: None,
        }
    }

    /// Enable segmentation with predicates built by `factory`
    pub fn with_predicates(
        mut self,
        factory: impl FnMut() -> Result<Box<dyn PresencePredicate<Mat>>> + 'a,
    ) -> Self {
        self.predicates = Some(Box::new(factory));
        self
    }

    /// Use `cutter` instead of locating ffmpeg
    pub fn with_cutter(mut self, cutter: impl SegmentCutter + 'a) -> Self {
        self.cutter = Some(Box::new(cutter));
        self
    }

    #[instrument(skip(self), fields(download_path = %self.config.download_path.display()))]
    pub fn run(&mut self) -> Result<BatchSummary> {
        let config = self.config;
        config.validate()?;

        if config.cut_segments && self.cutter.is_none() {
            self.cutter = Some(Box::new(FfmpegCutter::locate(config.ffmpeg_path.as_deref())?));
        }
        if config.perform_segmentation && self.predicates.is_none() {
            warn!("No landmark detector configured; using stored intervals only");
        }

        let videos = discover_videos(&config.download_path, &config.video_extensions)?;
        if videos.is_empty() {
            error!("No content found in {}", config.download_path.display());
        }

        let mut summary = BatchSummary::default();
        for video in videos {
            if summary.outcomes.len() >= config.video_limit {
                info!("Video limit of {} reached", config.video_limit);
                break;
            }

            match self.process_video(&video) {
                Ok(Some(outcome)) => summary.outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => {
                    error!("Processing {} failed: {}", video.display(), e);
                    summary.failed.push((video, e.to_string()));
                }
            }
        }

        info!(
            "Batch finished: {} videos with segments, {} failed",
            summary.outcomes.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    /// `None` when the video yields no intervals
    #[instrument(skip(self))]
    fn process_video(&mut self, video: &Path) -> Result<Option<VideoOutcome>> {
        let config = self.config;
        let id = video_id(video);
        let output_dir = config.video_output_dir(&id);
        std::fs::create_dir_all(&output_dir)?;
        info!("Processing video {} as {}", video.display(), id);

        let intervals = match self.predicates.as_mut() {
            Some(factory) if config.perform_segmentation => {
                let mut predicate = factory()?;
                let report = segment_video_file(video, predicate.as_mut(), &output_dir, &config.scan)?;
                if report.is_source_unavailable() {
                    return Ok(None);
                }
                consolidate_video(&output_dir, config.min_segment_length)?
            }
            _ => postprocess(&output_dir, config.min_segment_length)?,
        };

        if intervals.is_empty() {
            info!("No intervals for {}", id);
            return Ok(None);
        }

        let mut outcome = VideoOutcome {
            video: video.to_path_buf(),
            video_id: id,
            intervals,
            clips_written: 0,
            clip_failures: 0,
        };

        if config.cut_segments {
            if let Some(cutter) = self.cutter.as_deref() {
                let report = extract_segments(cutter, video, &outcome.intervals, &output_dir);
                outcome.clips_written = report.written.len();
                outcome.clip_failures = report.failures.len();
            }
        }

        Ok(Some(outcome))
    }
}

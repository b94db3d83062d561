//! Cutting consolidated intervals into standalone clips with ffmpeg.
//!
//! Streams are copied, never re-encoded, so cut points snap to whatever the
//! container allows. Output names depend only on the ordinal and the
//! interval bounds, so running the same extraction twice overwrites.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, instrument, warn};

use crate::common::{Interval, Result, SegmenterError};

/// Produces one media file covering `interval` of `source`
pub trait SegmentCutter {
    fn cut(&self, source: &Path, interval: &Interval, output: &Path) -> Result<()>;
}

/// Stream-copy cutter backed by the ffmpeg CLI
#[derive(Debug, Clone)]
pub struct FfmpegCutter {
    binary: PathBuf,
}

impl FfmpegCutter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Use `explicit` when given, otherwise find `ffmpeg` on PATH
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        let binary = which::which("ffmpeg")
            .map_err(|e| SegmenterError::FfmpegNotFound(e.to_string()))?;
        debug!("Using ffmpeg at {}", binary.display());
        Ok(Self::new(binary))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Command line arguments for one cut
    pub fn args(&self, source: &Path, interval: &Interval, output: &Path) -> Vec<OsString> {
        let (start, end) = clamped_bounds(interval);
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-ss".into(),
            format!("{:.3}", start).into(),
            "-to".into(),
            format!("{:.3}", end).into(),
            "-i".into(),
            source.as_os_str().to_owned(),
            "-c:v".into(),
            "copy".into(),
            "-c:a".into(),
            "copy".into(),
            output.as_os_str().to_owned(),
        ]
    }
}

impl SegmentCutter for FfmpegCutter {
    #[instrument(skip(self))]
    fn cut(&self, source: &Path, interval: &Interval, output: &Path) -> Result<()> {
        let result = Command::new(&self.binary)
            .args(self.args(source, interval, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(SegmenterError::ExtractionFailed {
                output: output.to_path_buf(),
                reason: format!("ffmpeg exited with {}: {}", result.status, stderr.trim()),
            });
        }
        Ok(())
    }
}

/// Interval bounds usable as seek targets (pre-padding may go below zero)
fn clamped_bounds(interval: &Interval) -> (f64, f64) {
    (interval.start().max(0.0), interval.end().max(0.0))
}

/// Deterministic clip file name: `"{index:04} {start:.3}-{end:.3}.{ext}"`
pub fn segment_file_name(index: usize, interval: &Interval, extension: Option<&str>) -> String {
    let (start, end) = clamped_bounds(interval);
    match extension {
        Some(ext) => format!("{:04} {:.3}-{:.3}.{}", index, start, end, ext),
        None => format!("{:04} {:.3}-{:.3}", index, start, end),
    }
}

/// Outcome of extracting a list of intervals
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub written: Vec<PathBuf>,
    /// Index into the interval list and the error for each failed cut
    pub failures: Vec<(usize, SegmenterError)>,
}

impl ExtractionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Cut every interval of `source` into `output_dir`
///
/// # Arguments
/// * `cutter` - Tool producing one clip per interval
/// * `source` - The video to cut; its extension is reused for the clips
/// * `intervals` - Consolidated intervals, in output order
/// * `output_dir` - Existing directory receiving the clips
///
/// # Returns
/// An `ExtractionReport` with the written clip paths and the failures. A
/// failed cut is logged and recorded; the remaining intervals are still
/// attempted, so this never returns early.
#[instrument(skip(cutter, intervals), fields(count = intervals.len()))]
pub fn extract_segments<C: SegmentCutter + ?Sized>(
    cutter: &C,
    source: &Path,
    intervals: &[Interval],
    output_dir: &Path,
) -> ExtractionReport {
    let extension = source.extension().and_then(|ext| ext.to_str());
    let mut report = ExtractionReport::default();

    for (index, interval) in intervals.iter().enumerate() {
        let output = output_dir.join(segment_file_name(index, interval, extension));
        debug!("Cutting {} into {}", interval, output.display());

        match cutter.cut(source, interval, &output) {
            Ok(()) => report.written.push(output),
            Err(e) => {
                warn!("Failed to cut interval {} ({}): {}", index, interval, e);
                report.failures.push((index, e));
            }
        }
    }

    info!(
        "Extracted {}/{} segments from {}",
        report.written.len(),
        intervals.len(),
        source.display()
    );
    report
}

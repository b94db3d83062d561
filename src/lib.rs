//! Activity segmentation for long videos
//!
//! This crate finds the stretches of a video where a tracked activity (hands
//! in a corner of the frame, as seen by a landmark model) is present, stores
//! them as resumable side-files, merges them into clean intervals, and cuts
//! each interval into its own clip without re-encoding.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use activity_segmenter::{consolidate, scan, Interval, NoCheckpoint, ScanConfig, VideoStream};
//! use opencv::core::Mat;
//!
//! let mut stream = VideoStream::open("video.mp4")?;
//! let mut predicate = |_frame: &Mat, _timestamp_ms: i64| -> activity_segmenter::Result<bool> {
//!     // plug a landmark model in here
//!     Ok(false)
//! };
//!
//! let report = scan(&mut stream, &mut predicate, Vec::new(), &ScanConfig::default(), &mut NoCheckpoint)?;
//! let clean: Vec<Interval> = consolidate(&report.intervals, 2.0);
//! for interval in clean {
//!     println!("activity {:.2}s - {:.2}s", interval.start(), interval.end());
//! }
//! # Ok::<(), activity_segmenter::SegmenterError>(())
//! ```

mod common;
mod config;
mod consolidate;
mod extract;
mod frame_source;
mod persistence;
mod pipeline;
mod presence;
mod segmenter;
mod video_stream;

// Re-export main types for public API
pub use common::{Interval, Result, SegmenterError};
pub use config::{AppConfig, LandmarkCriteria, LogConfig, ScanConfig};
pub use consolidate::{consolidate, merge_overlapping};
pub use extract::{extract_segments, segment_file_name, ExtractionReport, FfmpegCutter, SegmentCutter};
pub use frame_source::FrameSource;
pub use persistence::{
    load_intervals, save_intervals, Checkpoint, IntervalFile, NoCheckpoint, CONSOLIDATED_INTERVALS,
    RAW_INTERVALS,
};
pub use pipeline::{
    consolidate_video, discover_videos, postprocess, segment_video, segment_video_file, video_id,
    Batch, BatchSummary, PredicateFactory, VideoOutcome,
};
pub use presence::{
    landmark_predicate, AnyLandmarks, Corner, Cropped, Landmark, LandmarkDetector, PoseChecklist,
    PresencePredicate, RegionOfInterest, SegmentationMode,
};
pub use segmenter::{scan, ScanReport, Termination};
pub use video_stream::{get_video_info, VideoInfo, VideoStream};

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Initialize tracing for the library
///
/// Call this once at the start of your application. `RUST_LOG` takes
/// precedence over `level`. Output always goes to stderr; with `log_file`
/// set it is also appended to that file, without ANSI colors.
///
/// # Errors
/// * `Io` - If the log file or its directory cannot be created
pub fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    info!("Activity segmenter initialized with tracing level: {}", level);
    if let Some(path) = log_file {
        info!("Also logging to {}", path.display());
    }
    Ok(())
}

//! Sequential frame provider consumed by the segmentation engine.

use crate::common::Result;

/// A video-like stream of frames with timing metadata and seek support
///
/// Implementations report metadata as `None` when it is unknown or not
/// positive; the engine treats that as an unavailable source rather than an
/// error.
pub trait FrameSource {
    type Frame;

    /// Total number of frames in the stream
    fn frame_count(&self) -> Option<u64>;

    /// Frames per second
    fn fps(&self) -> Option<f64>;

    /// Read the next frame, `None` once the stream is exhausted
    fn read_frame(&mut self) -> Result<Option<Self::Frame>>;

    /// Elapsed time of the current stream position in milliseconds
    fn position_ms(&self) -> Result<f64>;

    /// Move the stream position to `ms` milliseconds from the start
    fn seek_ms(&mut self, ms: f64) -> Result<()>;
}

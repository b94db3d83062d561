//! Interval side-files.
//!
//! Each video owns a directory holding two JSON side-files: the raw engine
//! output (`.meta`, rewritten at every checkpoint) and the consolidated list
//! (`.meta.post`). A missing file is simply an empty list.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::common::{Interval, Result};

/// Side-file name for raw segmentation output
pub const RAW_INTERVALS: &str = ".meta";

/// Side-file name for consolidated output
pub const CONSOLIDATED_INTERVALS: &str = ".meta.post";

/// Write `intervals` to `location/name` as a JSON array of `[start, end]` pairs
///
/// The file is truncated first, so every call fully replaces earlier content.
#[instrument(skip(intervals), fields(count = intervals.len()))]
pub fn save_intervals(location: &Path, name: &str, intervals: &[Interval]) -> Result<()> {
    let path = location.join(name);
    let mut writer = BufWriter::new(File::create(&path)?);

    serde_json::to_writer_pretty(&mut writer, intervals)?;
    writer.flush()?;

    debug!("Saved {} intervals to {}", intervals.len(), path.display());
    Ok(())
}

/// Read the intervals stored at `location/name`
///
/// # Returns
/// The stored list, or an empty list when the file does not exist
///
/// # Errors
/// * `Json` - If the content is not an array of `[start, end]` pairs, or a
///   pair is invalid (`start >= end`, non-finite)
/// * `Io` - If the file exists but cannot be read
#[instrument]
pub fn load_intervals(location: &Path, name: &str) -> Result<Vec<Interval>> {
    let path = location.join(name);

    if !path.exists() {
        debug!("No side-file at {}, starting empty", path.display());
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(&path)?);
    let intervals: Vec<Interval> = serde_json::from_reader(reader)?;

    debug!("Loaded {} intervals from {}", intervals.len(), path.display());
    Ok(intervals)
}

/// Receiver of in-progress interval lists during a scan
pub trait Checkpoint {
    fn checkpoint(&mut self, intervals: &[Interval]) -> Result<()>;
}

/// A named side-file in a video's output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalFile {
    location: PathBuf,
    name: String,
}

impl IntervalFile {
    pub fn new(location: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            name: name.into(),
        }
    }

    /// Raw engine output in `location`
    pub fn raw(location: impl Into<PathBuf>) -> Self {
        Self::new(location, RAW_INTERVALS)
    }

    /// Consolidated output in `location`
    pub fn consolidated(location: impl Into<PathBuf>) -> Self {
        Self::new(location, CONSOLIDATED_INTERVALS)
    }

    pub fn path(&self) -> PathBuf {
        self.location.join(&self.name)
    }

    pub fn load(&self) -> Result<Vec<Interval>> {
        load_intervals(&self.location, &self.name)
    }

    pub fn save(&self, intervals: &[Interval]) -> Result<()> {
        save_intervals(&self.location, &self.name, intervals)
    }
}

impl Checkpoint for IntervalFile {
    fn checkpoint(&mut self, intervals: &[Interval]) -> Result<()> {
        self.save(intervals)
    }
}

/// Checkpoint sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCheckpoint;

impl Checkpoint for NoCheckpoint {
    fn checkpoint(&mut self, _intervals: &[Interval]) -> Result<()> {
        Ok(())
    }
}

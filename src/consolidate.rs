//! Interval consolidation: merge overlapping or touching intervals, then drop
//! the ones shorter than a minimum length.
//!
//! Merging runs before filtering, so a short interval that overlaps a long
//! neighbour survives as part of the merged result.

use tracing::{debug, instrument};

use crate::common::Interval;

/// Sort, merge and length-filter `intervals`
///
/// The output is sorted by start, no two intervals overlap or touch, and
/// every duration is at least `min_length`. The input is left untouched.
#[instrument(skip(intervals), fields(count = intervals.len()))]
pub fn consolidate(intervals: &[Interval], min_length: f64) -> Vec<Interval> {
    let merged = merge_overlapping(intervals);
    let merged_count = merged.len();

    let kept: Vec<Interval> = merged
        .into_iter()
        .filter(|interval| interval.duration() >= min_length)
        .collect();

    debug!(
        "Consolidated {} intervals: {} after merge, {} at least {:.2}s long",
        intervals.len(),
        merged_count,
        kept.len(),
        min_length
    );
    kept
}

/// Merge overlapping and touching intervals into a sorted, disjoint list
pub fn merge_overlapping(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted = intervals.to_vec();
    // stable, ties keep their input order
    sorted.sort_by(|a, b| a.start().total_cmp(&b.start()));

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for next in sorted {
        if let Some(current) = merged.last_mut() {
            if next.start() <= current.end() {
                *current = current.extended_to(next.end());
                continue;
            }
        }
        merged.push(next);
    }
    merged
}

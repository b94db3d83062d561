//! End-to-end behaviour of the segmentation engine over synthetic videos.

mod common;

use activity_segmenter::{
    scan, segment_video, Interval, IntervalFile, NoCheckpoint, ScanConfig, SegmenterError,
    Termination,
};
use common::{assert_close, scan_config, windows, RecordingCheckpoint, SyntheticVideo};

#[test]
fn single_run_uses_closing_frame_for_end() {
    // 25 fps sampled at 5 fps: every 5th frame is inspected
    let mut video = SyntheticVideo::new(100, 25.0);
    let mut predicate = windows(vec![(10, 40)]);

    let report = scan(
        &mut video,
        &mut predicate,
        Vec::new(),
        &scan_config(5.0, 1.0, 0.5),
        &mut NoCheckpoint,
    )
    .unwrap();

    assert_eq!(report.termination, Termination::EndOfStream);
    assert_eq!(report.intervals.len(), 1);

    let interval = report.intervals[0];
    // Opened at sampled frame 10, closed by the first negative sample at 45
    assert_close(interval.start(), 10.0 / 25.0 - 1.0);
    assert_close(interval.end(), 45.0 / 25.0 + 0.5);
    // Not the last positive sample (40)
    assert!(interval.end() > 40.0 / 25.0 + 0.5);
}

#[test]
fn start_is_not_clamped_at_zero() {
    let mut video = SyntheticVideo::new(50, 25.0);
    let mut predicate = windows(vec![(5, 10)]);

    let report = scan(
        &mut video,
        &mut predicate,
        Vec::new(),
        &scan_config(5.0, 2.0, 0.0),
        &mut NoCheckpoint,
    )
    .unwrap();

    assert!(report.intervals[0].start() < 0.0);
}

#[test]
fn several_runs_in_detection_order() {
    let mut video = SyntheticVideo::new(200, 10.0);
    let mut predicate = windows(vec![(20, 30), (60, 65), (150, 170)]);

    let report = scan(
        &mut video,
        &mut predicate,
        Vec::new(),
        &scan_config(10.0, 0.0, 0.0),
        &mut NoCheckpoint,
    )
    .unwrap();

    let expected = vec![
        Interval::new(2.0, 3.1).unwrap(),
        Interval::new(6.0, 6.6).unwrap(),
        Interval::new(15.0, 17.1).unwrap(),
    ];
    assert_eq!(report.intervals.len(), expected.len());
    for (actual, expected) in report.intervals.iter().zip(&expected) {
        assert_close(actual.start(), expected.start());
        assert_close(actual.end(), expected.end());
    }
    assert_eq!(report.new_intervals, 3);
}

#[test]
fn interval_limit_stops_scan_early() {
    let mut video = SyntheticVideo::new(1000, 10.0);
    // a short run every 20 frames
    let mut predicate = |frame: &u64, _: i64| -> activity_segmenter::Result<bool> {
        Ok(frame % 20 < 5)
    };
    let config = ScanConfig {
        max_intervals: 3,
        ..scan_config(10.0, 0.0, 0.0)
    };

    let report = scan(&mut video, &mut predicate, Vec::new(), &config, &mut NoCheckpoint).unwrap();

    assert_eq!(report.termination, Termination::LimitReached);
    assert_eq!(report.intervals.len(), 3);
    assert!(video.position < 1000, "scan should stop before the end of the video");
    for interval in &report.intervals {
        assert!(interval.end() <= video.position as f64 / 10.0);
    }
}

#[test]
fn checkpoints_happen_on_multiples_only() {
    let mut video = SyntheticVideo::new(400, 10.0);
    let mut predicate = |frame: &u64, _: i64| -> activity_segmenter::Result<bool> {
        Ok(frame % 40 < 10)
    };
    let config = ScanConfig {
        checkpoint_interval: 3,
        ..scan_config(5.0, 0.0, 0.0)
    };
    let mut recorder = RecordingCheckpoint::default();

    let report = scan(&mut video, &mut predicate, Vec::new(), &config, &mut recorder).unwrap();

    assert!(report.intervals.len() >= 6);
    assert!(!recorder.snapshots.is_empty());
    for snapshot in &recorder.snapshots {
        assert_eq!(snapshot.len() % 3, 0);
        assert_eq!(snapshot[..], report.intervals[..snapshot.len()]);
    }
    assert!(recorder.snapshots.iter().any(|s| s.len() == 6));
}

#[test]
fn unavailable_source_discards_known_intervals() {
    let mut video = SyntheticVideo::new(100, 0.0);
    let mut predicate = windows(vec![(1, 100)]);
    let known = vec![Interval::new(0.0, 2.0).unwrap()];

    let report = scan(
        &mut video,
        &mut predicate,
        known,
        &scan_config(5.0, 0.0, 0.0),
        &mut NoCheckpoint,
    )
    .unwrap();

    assert!(matches!(report.termination, Termination::SourceUnavailable { .. }));
    assert!(report.intervals.is_empty());
    assert_eq!(video.position, 0);
}

#[test]
fn known_intervals_trigger_seek_to_last_end() {
    let mut video = SyntheticVideo::new(300, 25.0);
    let mut predicate = windows(vec![]);
    let known = vec![
        Interval::new(0.5, 1.25).unwrap(),
        Interval::new(3.0, 4.0).unwrap(),
    ];

    let report = scan(
        &mut video,
        &mut predicate,
        known.clone(),
        &scan_config(5.0, 0.0, 0.0),
        &mut NoCheckpoint,
    )
    .unwrap();

    assert_eq!(video.seeks, vec![4000.0]);
    assert_eq!(report.intervals, known);
    assert_eq!(report.new_intervals, 0);
    // 4s at 25 fps is frame 100
    assert_eq!(report.frames_read, 200);
}

#[test]
fn resumed_scan_keeps_prefix_and_absolute_times() {
    let dir = tempfile::tempdir().unwrap();
    let config = scan_config(5.0, 0.5, 0.5);
    let runs = vec![(20, 40), (100, 140), (200, 240)];

    // First run dies after 150 frames
    let mut truncated = SyntheticVideo::new(150, 25.0);
    let first = segment_video(&mut truncated, &mut windows(runs.clone()), dir.path(), &config).unwrap();
    assert_eq!(first.intervals.len(), 2);
    assert_eq!(IntervalFile::raw(dir.path()).load().unwrap(), first.intervals);

    // Restart on the full video picks the checkpoint up
    let mut full = SyntheticVideo::new(300, 25.0);
    let second = segment_video(&mut full, &mut windows(runs), dir.path(), &config).unwrap();

    assert_eq!(full.seeks.len(), 1);
    assert_eq!(second.intervals.len(), 3);
    assert_eq!(second.intervals[..2], first.intervals[..]);
    assert_eq!(second.new_intervals, 1);

    let resumed = second.intervals[2];
    assert_close(resumed.start(), 200.0 / 25.0 - 0.5);
    assert_close(resumed.end(), 245.0 / 25.0 + 0.5);

    assert_eq!(IntervalFile::raw(dir.path()).load().unwrap(), second.intervals);
}

#[test]
fn checkpoint_file_survives_an_aborted_scan() {
    let dir = tempfile::tempdir().unwrap();
    let config = scan_config(5.0, 0.0, 0.0);
    let mut video = SyntheticVideo::new(300, 25.0);

    // Predicate fails after two runs have been recorded
    let mut predicate = |frame: &u64, ts: i64| -> activity_segmenter::Result<bool> {
        if *frame >= 200 {
            return Err(SegmenterError::predicate_error(ts, "model lost"));
        }
        Ok((20..=40).contains(frame) || (100..=140).contains(frame))
    };

    let result = segment_video(&mut video, &mut predicate, dir.path(), &config);
    assert!(result.is_err());

    let saved = IntervalFile::raw(dir.path()).load().unwrap();
    assert_eq!(saved.len(), 2);
}

#[test]
fn failed_resume_seek_leaves_side_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let config = scan_config(5.0, 0.0, 0.0);
    let known = vec![Interval::new(0.8, 1.8).unwrap()];
    IntervalFile::raw(dir.path()).save(&known).unwrap();

    let mut video = SyntheticVideo::new(300, 25.0);
    video.ignores_seek = true;
    let result = segment_video(&mut video, &mut windows(vec![(20, 40)]), dir.path(), &config);

    assert!(matches!(result, Err(SegmenterError::SeekFailed { .. })));
    // nothing was read, so the known run cannot be detected a second time
    assert_eq!(video.position, 0);
    assert_eq!(IntervalFile::raw(dir.path()).load().unwrap(), known);
}

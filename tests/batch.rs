//! Batch runs over a temporary download directory.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use activity_segmenter::{
    AppConfig, Batch, Interval, IntervalFile, PresencePredicate, Result, SegmentCutter,
    SegmenterError,
};
use opencv::core::Mat;

/// Records every requested cut; fails for intervals starting at `fail_at`
struct RecordingCutter<'a> {
    cuts: &'a RefCell<Vec<(PathBuf, Interval, PathBuf)>>,
    fail_at: Option<f64>,
}

impl SegmentCutter for RecordingCutter<'_> {
    fn cut(&self, source: &Path, interval: &Interval, output: &Path) -> Result<()> {
        if self.fail_at == Some(interval.start()) {
            return Err(SegmenterError::ExtractionFailed {
                output: output.to_path_buf(),
                reason: "simulated failure".to_string(),
            });
        }
        self.cuts
            .borrow_mut()
            .push((source.to_path_buf(), *interval, output.to_path_buf()));
        Ok(())
    }
}

struct Workspace {
    _root: tempfile::TempDir,
    config: AppConfig,
}

fn workspace(files: &[(&str, &[u8])]) -> Workspace {
    let root = tempfile::tempdir().unwrap();
    let downloads = root.path().join("downloads");
    std::fs::create_dir_all(&downloads).unwrap();
    for (name, content) in files {
        std::fs::write(downloads.join(name), content).unwrap();
    }

    let config = AppConfig {
        download_path: downloads,
        segments_path: root.path().join("segments"),
        video_limit: 5,
        ..AppConfig::default()
    };
    Workspace {
        _root: root,
        config,
    }
}

fn iv(start: f64, end: f64) -> Interval {
    Interval::new(start, end).unwrap()
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

#[test]
fn stored_intervals_are_consolidated_and_cut() {
    let ws = workspace(&[("abc - Title.mp4", b""), ("def.mkv", b""), ("skip.txt", b"")]);
    let abc_dir = ws.config.video_output_dir("abc");
    std::fs::create_dir_all(&abc_dir).unwrap();
    IntervalFile::raw(&abc_dir)
        .save(&[iv(0.0, 5.0), iv(4.0, 9.0), iv(20.0, 25.0), iv(30.0, 31.0)])
        .unwrap();

    let cuts = RefCell::new(Vec::new());
    let summary = Batch::new(&ws.config)
        .with_cutter(RecordingCutter {
            cuts: &cuts,
            fail_at: None,
        })
        .run()
        .unwrap();

    assert!(summary.failed.is_empty());
    assert_eq!(summary.outcomes.len(), 1);

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.video_id, "abc");
    assert_eq!(outcome.intervals, vec![iv(0.0, 9.0), iv(20.0, 25.0)]);
    assert_eq!(outcome.clips_written, 2);
    assert_eq!(outcome.clip_failures, 0);

    let cuts = cuts.borrow();
    let names: Vec<String> = cuts.iter().map(|(_, _, output)| file_name(output)).collect();
    assert_eq!(names, vec!["0000 0.000-9.000.mp4", "0001 20.000-25.000.mp4"]);
    for (source, _, output) in cuts.iter() {
        assert_eq!(file_name(source), "abc - Title.mp4");
        assert_eq!(output.parent().unwrap(), abc_dir.as_path());
    }

    // consolidated side-file written next to the raw one
    assert_eq!(
        IntervalFile::consolidated(&abc_dir).load().unwrap(),
        outcome.intervals
    );
    // a video without stored intervals still gets its output directory
    assert!(ws.config.video_output_dir("def").is_dir());
}

#[test]
fn failed_cut_does_not_stop_the_others() {
    let ws = workspace(&[("abc.mp4", b"")]);
    let abc_dir = ws.config.video_output_dir("abc");
    std::fs::create_dir_all(&abc_dir).unwrap();
    IntervalFile::raw(&abc_dir)
        .save(&[iv(0.0, 3.0), iv(10.0, 13.0), iv(20.0, 23.0)])
        .unwrap();

    let cuts = RefCell::new(Vec::new());
    let summary = Batch::new(&ws.config)
        .with_cutter(RecordingCutter {
            cuts: &cuts,
            fail_at: Some(10.0),
        })
        .run()
        .unwrap();

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.clips_written, 2);
    assert_eq!(outcome.clip_failures, 1);
    assert_eq!(cuts.borrow().len(), 2);
}

#[test]
fn video_limit_counts_videos_with_segments() {
    let ws = workspace(&[("a.mp4", b""), ("b.mp4", b""), ("c.mp4", b"")]);
    let config = AppConfig {
        video_limit: 1,
        cut_segments: false,
        ..ws.config.clone()
    };
    // only b and c have intervals; a yields nothing and does not count
    for id in ["b", "c"] {
        let dir = config.video_output_dir(id);
        std::fs::create_dir_all(&dir).unwrap();
        IntervalFile::raw(&dir).save(&[iv(1.0, 6.0)]).unwrap();
    }

    let summary = Batch::new(&config).run().unwrap();

    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(summary.outcomes[0].video_id, "b");
    assert_eq!(summary.outcomes[0].clips_written, 0);
}

#[test]
fn unreadable_video_is_skipped_with_predicates() {
    let ws = workspace(&[("broken.mp4", b"definitely not a video")]);
    let config = AppConfig {
        cut_segments: false,
        ..ws.config.clone()
    };

    let calls = Cell::new(0);
    let summary = Batch::new(&config)
        .with_predicates(|| {
            calls.set(calls.get() + 1);
            let predicate: Box<dyn PresencePredicate<Mat>> =
                Box::new(|_: &Mat, _: i64| -> Result<bool> { Ok(true) });
            Ok(predicate)
        })
        .run()
        .unwrap();

    assert_eq!(calls.get(), 1);
    assert!(summary.outcomes.is_empty());
    assert!(summary.failed.is_empty());
    assert!(!config.video_output_dir("broken").join(".meta").exists());
}

#[test]
fn corrupt_side_file_fails_only_that_video() {
    let ws = workspace(&[("bad.mp4", b""), ("good.mp4", b"")]);
    let config = AppConfig {
        cut_segments: false,
        ..ws.config.clone()
    };
    let bad_dir = config.video_output_dir("bad");
    std::fs::create_dir_all(&bad_dir).unwrap();
    std::fs::write(bad_dir.join(".meta"), b"{not json").unwrap();
    let good_dir = config.video_output_dir("good");
    std::fs::create_dir_all(&good_dir).unwrap();
    IntervalFile::raw(&good_dir).save(&[iv(0.0, 4.0)]).unwrap();

    let summary = Batch::new(&config).run().unwrap();

    assert_eq!(summary.failed.len(), 1);
    assert_eq!(file_name(&summary.failed[0].0), "bad.mp4");
    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(summary.outcomes[0].video_id, "good");
}

//! Command-line interface for the activity segmenter
//!
//! Runs the batch pipeline over a download directory: consolidates stored
//! segmentation results and cuts them into clips. Landmark inference is not
//! bundled with the binary; segmentation with a detector goes through the
//! library's `Batch::with_predicates`.

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Instant;
use tracing::{debug, info, warn};

use activity_segmenter::{
    consolidate_video, get_video_info, init_tracing, AppConfig, Batch, SegmentationMode,
};

/// Command-line arguments structure
#[derive(Debug, Default)]
struct Args {
    config_path: Option<PathBuf>,
    download_path: Option<PathBuf>,
    segments_path: Option<PathBuf>,
    mode: Option<SegmentationMode>,
    min_length: Option<f64>,
    video_limit: Option<usize>,
    no_cut: bool,
    verbose: bool,
    info_video: Option<String>,
    consolidate_dir: Option<PathBuf>,
    output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum OutputFormat {
    #[default]
    Simple,
    Json,
}

const USAGE: &str = "Usage: activity-segmenter [OPTIONS]

Options:
  --config <file>          JSON configuration file
  --download-path <dir>    Directory with input videos
  --segments-path <dir>    Root directory for per-video output
  --mode <mode>            Segmentation mode: pose|hand
  --min-length <seconds>   Minimum consolidated interval length
  --limit <n>              Maximum number of videos with segments to process
  --no-cut                 Do not cut clips, only consolidate
  --info <video>           Show video information only
  --consolidate <dir>      Consolidate one output directory and print the result
  --format <fmt>           Output format: simple|json (default: simple)
  --verbose                Enable debug logging
  --help                   Show this help message";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = parse_args(env::args().skip(1).collect())?;
    let config = build_config(&args)?;

    let level = if args.verbose { "debug" } else { config.log.level.as_str() };
    init_tracing(level, config.log.file.as_deref()).context("failed to initialize logging")?;

    info!("Activity segmenter v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Some(video) = &args.info_video {
        return show_video_info(video);
    }

    if let Some(dir) = &args.consolidate_dir {
        let intervals = consolidate_video(dir, config.min_segment_length)
            .with_context(|| format!("failed to consolidate {}", dir.display()))?;
        match args.output_format {
            OutputFormat::Simple => {
                for (index, interval) in intervals.iter().enumerate() {
                    println!("{:04} {}", index, interval);
                }
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&intervals)?),
        }
        return Ok(());
    }

    let start_time = Instant::now();
    let summary = Batch::new(&config).run().context("batch run failed")?;
    let elapsed = start_time.elapsed();

    match args.output_format {
        OutputFormat::Simple => {
            println!("Processed {} videos in {:.1}s", summary.outcomes.len(), elapsed.as_secs_f64());
            for outcome in &summary.outcomes {
                println!(
                    "  {}: {} intervals, {} clips written, {} failed",
                    outcome.video_id,
                    outcome.intervals.len(),
                    outcome.clips_written,
                    outcome.clip_failures
                );
            }
            for (video, reason) in &summary.failed {
                println!("  FAILED {}: {}", video.display(), reason);
            }
        }
        OutputFormat::Json => {
            let videos: Vec<_> = summary
                .outcomes
                .iter()
                .map(|outcome| {
                    serde_json::json!({
                        "video": outcome.video,
                        "video_id": outcome.video_id,
                        "intervals": outcome.intervals,
                        "clips_written": outcome.clips_written,
                        "clip_failures": outcome.clip_failures,
                    })
                })
                .collect();
            let failed: Vec<_> = summary
                .failed
                .iter()
                .map(|(video, reason)| serde_json::json!({ "video": video, "error": reason }))
                .collect();
            let output = serde_json::json!({
                "elapsed_ms": elapsed.as_millis() as u64,
                "videos": videos,
                "failed": failed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    if !summary.failed.is_empty() {
        warn!("{} videos failed", summary.failed.len());
    }
    Ok(())
}

fn parse_args(raw: Vec<String>) -> Result<Args> {
    let mut args = Args::default();
    let mut iter = raw.into_iter();

    while let Some(flag) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .with_context(|| format!("{} requires a value", name))
        };

        match flag.as_str() {
            "--config" => args.config_path = Some(PathBuf::from(value("--config")?)),
            "--download-path" => args.download_path = Some(PathBuf::from(value("--download-path")?)),
            "--segments-path" => args.segments_path = Some(PathBuf::from(value("--segments-path")?)),
            "--mode" => args.mode = Some(value("--mode")?.parse()?),
            "--min-length" => {
                args.min_length = Some(
                    value("--min-length")?
                        .parse::<f64>()
                        .context("Invalid min-length value")?,
                )
            }
            "--limit" => {
                args.video_limit = Some(value("--limit")?.parse::<usize>().context("Invalid limit value")?)
            }
            "--info" => args.info_video = Some(value("--info")?),
            "--consolidate" => args.consolidate_dir = Some(PathBuf::from(value("--consolidate")?)),
            "--format" => {
                args.output_format = match value("--format")?.as_str() {
                    "simple" => OutputFormat::Simple,
                    "json" => OutputFormat::Json,
                    other => bail!("Invalid format '{}'. Use 'simple' or 'json'", other),
                }
            }
            "--no-cut" => args.no_cut = true,
            "--verbose" => args.verbose = true,
            "--help" => bail!("{}", USAGE),
            other => bail!("Unknown option: {}\n\n{}", other, USAGE),
        }
    }

    Ok(args)
}

/// Configuration file (or defaults) with command-line overrides applied
fn build_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config_path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };

    if let Some(path) = &args.download_path {
        config.download_path = path.clone();
    }
    if let Some(path) = &args.segments_path {
        config.segments_path = path.clone();
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(min_length) = args.min_length {
        config.min_segment_length = min_length;
    }
    if let Some(limit) = args.video_limit {
        config.video_limit = limit;
    }
    if args.no_cut {
        config.cut_segments = false;
    }

    config.validate()?;
    Ok(config)
}

fn show_video_info(video_path: &str) -> Result<()> {
    let video_info = get_video_info(video_path)
        .with_context(|| format!("failed to get video info for {}", video_path))?;

    println!("Video Information:");
    println!("  Path: {}", video_info.path);
    println!("  Dimensions: {}x{}", video_info.width, video_info.height);
    println!("  Frame Rate: {:.2} fps", video_info.fps);
    println!("  Frame Count: {}", video_info.frame_count);
    println!("  Duration: {:.2} seconds", video_info.duration_seconds);
    println!("  Description: {}", video_info.description());

    if !video_info.is_scannable() {
        warn!("Video metadata is unusable - segmentation would skip this video");
    }
    Ok(())
}

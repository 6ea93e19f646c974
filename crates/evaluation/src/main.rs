mod utils;
use anyhow::{Context, Result};
use clap::Parser;
use itertools::Itertools;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use track_consistency::{
    score_video, BenchmarkSummary, ConsistencyRecord, PointLogEntry, ScorerConfig, VideoOutcome,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use utils::{mask_loading::*, output::*, prediction_loading::*};

/// Score how consistently predicted point tracks stay on their ground truth objects
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The dataset root holding one directory per video with `gt_masks/`
    #[arg(short, long)]
    dataset: PathBuf,

    /// The results root holding one directory per video with the predicted tracks
    #[arg(short, long)]
    results: PathBuf,

    /// Prefix of the video directory names
    #[arg(long, default_value = "video_")]
    video_prefix: String,

    /// File stem of the prediction file, `.npz` or `.npy`
    #[arg(long, default_value = "track2d_pred")]
    prediction_name: String,

    /// Array name inside an `.npz` prediction archive
    #[arg(long, default_value = "track2d_pred")]
    npz_key: String,

    /// Width of the prediction coordinate space
    #[arg(long, default_value_t = 336)]
    prediction_width: u32,

    /// Height of the prediction coordinate space
    #[arg(long, default_value_t = 336)]
    prediction_height: u32,

    /// How RGB ground truth masks encode object ids
    #[arg(short, long, value_enum, default_value_t = MaskDecoding::Channel)]
    mask_decoding: MaskDecoding,

    /// The identity channel for `--mask-decoding channel`
    #[arg(long, default_value_t = 0)]
    channel: usize,

    /// The output directory
    #[arg(short, long, default_value = "benchmark")]
    output: PathBuf,

    /// Also write a per point log
    #[arg(short, long)]
    point_log: bool,

    /// Number of videos scored in parallel
    #[arg(short, long, default_value_t = num_cpus::get())]
    jobs: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = scorer_config(&args)?;

    let videos = discover_videos(&args.dataset, &args.video_prefix)?;
    info!("found {} videos in {}", videos.len(), args.dataset.display());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs.max(1))
        .build()?;
    let outcomes = pool.install(|| {
        videos
            .par_iter()
            .map(|video_name| evaluate_video(&args, &config, video_name))
            .collect::<Result<Vec<_>>>()
    })?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let evaluations = outcomes
        .iter()
        .filter_map(|outcome| outcome.evaluation())
        .collect::<Vec<_>>();
    let records = evaluations
        .iter()
        .flat_map(|evaluation| evaluation.records().iter().cloned())
        .collect::<Vec<ConsistencyRecord>>();
    write_csv(&args.output.join("consistency_results.csv"), &records)?;

    let summary = BenchmarkSummary::from_outcomes(&outcomes);
    write_csv(&args.output.join("video_scores.csv"), summary.video_scores())?;

    if args.point_log {
        let point_log = evaluations
            .iter()
            .flat_map(|evaluation| evaluation.point_log().iter().cloned())
            .collect::<Vec<PointLogEntry>>();
        write_csv(&args.output.join("point_log.csv"), &point_log)?;
    }

    log_summary(&summary);
    Ok(())
}

fn scorer_config(args: &Args) -> Result<ScorerConfig> {
    let mut config = ScorerConfig::default();
    config
        .with_prediction_resolution(args.prediction_width, args.prediction_height)
        .with_point_log(args.point_log);
    config.validate()?;
    Ok(config)
}

/// Sorted names of the `<prefix>*` directories under the dataset root.
fn discover_videos(dataset: &Path, prefix: &str) -> Result<Vec<String>> {
    let pattern = dataset.join(format!("{prefix}*"));
    let videos = glob::glob(&pattern.to_string_lossy())?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .sorted()
        .collect();
    Ok(videos)
}

/// Load the inputs of one video and score it.
///
/// Missing or unreadable inputs skip the video, scoring errors abort the run.
fn evaluate_video(args: &Args, config: &ScorerConfig, video_name: &str) -> Result<VideoOutcome> {
    let result_dir = args.results.join(video_name);
    let Some(prediction_path) = prediction_path(&result_dir, &args.prediction_name) else {
        warn!(video = video_name, "no prediction file in {}", result_dir.display());
        return Ok(VideoOutcome::skipped(video_name, "missing prediction"));
    };
    let prediction = match load_prediction(&prediction_path, &args.npz_key) {
        Ok(prediction) => prediction,
        Err(err) => {
            warn!(video = video_name, "{:#}", err);
            return Ok(VideoOutcome::skipped(video_name, format!("{err:#}")));
        }
    };

    let ground_truth = match load_ground_truth(
        &args.dataset.join(video_name),
        args.mask_decoding,
        args.channel,
    ) {
        Ok(ground_truth) => ground_truth,
        Err(err) => {
            warn!(video = video_name, "{:#}", err);
            return Ok(VideoOutcome::skipped(video_name, format!("{err:#}")));
        }
    };

    let outcome = score_video(video_name, &prediction, &ground_truth, config)?;
    if let Some(evaluation) = outcome.evaluation() {
        info!(
            video = video_name,
            frames = evaluation.frames_scored(),
            attempted = evaluation.score().attempted(),
            "consistency {:.2}%",
            evaluation.score().percentage()
        );
    }
    Ok(outcome)
}

fn log_summary(summary: &BenchmarkSummary) {
    for (video_name, mean) in summary.video_record_means() {
        info!("{video_name}: mean record score {mean:.4}");
    }
    for video_name in summary.skipped() {
        warn!("{video_name}: skipped");
    }
    info!(
        videos = summary.video_scores().len(),
        skipped = summary.skipped().len(),
        "overall consistency {:.2}%, mean record score {:.4}",
        summary.overall_average(),
        summary.mean_record_score()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use npyz::WriterBuilder;
    use std::io::Write;

    fn args(dataset: &Path, results: &Path, extra: &[&str]) -> Args {
        let mut argv = vec![
            "evaluation",
            "--dataset",
            dataset.to_str().unwrap(),
            "--results",
            results.to_str().unwrap(),
        ];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    /// One video with a 40x40 RGB mask whose red channel carries object 5 and a single track on it.
    fn rgb_video(dataset: &Path, results: &Path) -> Result<()> {
        let masks = dataset.join("video_0001").join("gt_masks");
        std::fs::create_dir_all(&masks)?;
        let mut mask = RgbImage::new(40, 40);
        for x in 15..25 {
            for y in 15..25 {
                mask.put_pixel(x, y, Rgb([5, 80, 200]));
            }
        }
        mask.save(masks.join("segmentation_00000.png"))?;
        mask.save(masks.join("segmentation_00001.png"))?;

        let result_dir = results.join("video_0001");
        std::fs::create_dir_all(&result_dir)?;
        let mut buffer = vec![];
        let mut writer = npyz::WriteOptions::new()
            .default_dtype()
            .shape(&[2, 1, 3])
            .writer(&mut buffer)
            .begin_nd()?;
        writer.extend([10.0f32, 10.0, 1.0, 11.0, 10.0, 1.0])?;
        writer.finish()?;
        std::fs::File::create(result_dir.join("track2d_pred.npy"))?.write_all(&buffer)?;
        Ok(())
    }

    #[test]
    fn test_discover_videos() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["video_0002", "video_0001", "other"] {
            std::fs::create_dir(dir.path().join(name))?;
        }
        std::fs::write(dir.path().join("video_notes.txt"), "")?;

        let videos = discover_videos(dir.path(), "video_")?;
        assert_eq!(videos, vec!["video_0001", "video_0002"]);
        Ok(())
    }

    #[test]
    fn test_missing_prediction_skips() -> Result<()> {
        let dataset = tempfile::tempdir()?;
        let results = tempfile::tempdir()?;
        std::fs::create_dir(dataset.path().join("video_0001"))?;
        let args = args(dataset.path(), results.path(), &[]);

        let outcome = evaluate_video(&args, &ScorerConfig::default(), "video_0001")?;
        assert!(matches!(outcome, VideoOutcome::Skipped { .. }));
        Ok(())
    }

    #[test]
    fn test_rgb_video_scores_with_default_decoding() -> Result<()> {
        let dataset = tempfile::tempdir()?;
        let results = tempfile::tempdir()?;
        rgb_video(dataset.path(), results.path())?;
        let args = args(
            dataset.path(),
            results.path(),
            &["--prediction-width", "20", "--prediction-height", "20"],
        );
        assert_eq!(args.mask_decoding, MaskDecoding::Channel);

        let outcome = evaluate_video(&args, &scorer_config(&args)?, "video_0001")?;
        let evaluation = outcome.evaluation().unwrap();
        assert_eq!(evaluation.frames_scored(), 2);
        assert_eq!(evaluation.score().attempted(), 2);
        assert_eq!(evaluation.score().percentage(), 100.0);
        assert!(evaluation
            .records()
            .iter()
            .all(|record| record.object_id() == 5));
        Ok(())
    }

    #[test]
    fn test_rgb_video_palette_needs_metadata() -> Result<()> {
        let dataset = tempfile::tempdir()?;
        let results = tempfile::tempdir()?;
        rgb_video(dataset.path(), results.path())?;
        let args = args(dataset.path(), results.path(), &["--mask-decoding", "palette"]);

        let outcome = evaluate_video(&args, &scorer_config(&args)?, "video_0001")?;
        assert!(matches!(outcome, VideoOutcome::Skipped { .. }));
        Ok(())
    }
}

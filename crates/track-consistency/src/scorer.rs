use crate::*;
use anyhow::Result;
use tracing::{debug, warn};

/// The result of scoring one video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoEvaluation {
    /// One record per (frame, object) with at least one scored point, in frame order.
    records: Vec<ConsistencyRecord>,
    /// Video level percentage.
    score: VideoScore,
    /// Per point log, empty unless enabled in the [`ScorerConfig`].
    point_log: Vec<PointLogEntry>,
    /// Number of prediction frames that had a ground truth frame.
    frames_scored: usize,
}

impl VideoEvaluation {
    /// Returns a new VideoEvaluation
    pub fn new(
        records: Vec<ConsistencyRecord>,
        score: VideoScore,
        point_log: Vec<PointLogEntry>,
        frames_scored: usize,
    ) -> VideoEvaluation {
        VideoEvaluation {
            records,
            score,
            point_log,
            frames_scored,
        }
    }

    /// Returns the consistency records
    pub fn records(&self) -> &[ConsistencyRecord] {
        &self.records
    }

    /// Returns the video score
    pub fn score(&self) -> &VideoScore {
        &self.score
    }

    /// Returns the per point log
    pub fn point_log(&self) -> &[PointLogEntry] {
        &self.point_log
    }

    /// Returns the number of scored prediction frames
    pub fn frames_scored(&self) -> usize {
        self.frames_scored
    }
}

/// Outcome of one video of a benchmark run.
///
/// * `Scored` holds the evaluation.
/// * `Skipped` marks a video whose inputs were missing, it takes no part in the averages.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoOutcome {
    Scored(VideoEvaluation),
    Skipped { video_name: String, reason: String },
}

impl VideoOutcome {
    /// Returns a skipped outcome
    pub fn skipped(video_name: impl Into<String>, reason: impl Into<String>) -> VideoOutcome {
        VideoOutcome::Skipped {
            video_name: video_name.into(),
            reason: reason.into(),
        }
    }

    /// Returns the evaluation of a scored video
    pub fn evaluation(&self) -> Option<&VideoEvaluation> {
        match self {
            VideoOutcome::Scored(evaluation) => Some(evaluation),
            VideoOutcome::Skipped { .. } => None,
        }
    }
}

/// Score how consistently the predicted tracks of one video stay on their ground truth objects.
///
/// Identities are fixed from the first frame, then every prediction frame is scored against the ground truth
/// frame `frame * stride` until the ground truth runs out.
///
/// # Parameters
///
/// * `video_name`: Name stamped on the records.
/// * `prediction`: The predicted tracks in prediction space.
/// * `ground_truth`: The ground truth masks of the video.
/// * `config`: Prediction resolution and radius table.
///
/// # Returns
///
/// `VideoOutcome::Skipped` when there is no ground truth, otherwise the scored evaluation.
pub fn score_video(
    video_name: &str,
    prediction: &Prediction,
    ground_truth: &GroundTruthSequence,
    config: &ScorerConfig,
) -> Result<VideoOutcome> {
    config.validate()?;

    let (width, height, first_frame) = match (ground_truth.resolution(), ground_truth.get(0)) {
        (Some((width, height)), Some(first_frame)) => (width, height, first_frame),
        _ => {
            warn!(video = video_name, "no ground truth frames, skipping");
            return Ok(VideoOutcome::skipped(video_name, "no ground truth frames"));
        }
    };

    let mapper = CoordinateMapper::new(
        config.prediction_width(),
        config.prediction_height(),
        width,
        height,
    );
    let identities = IdentityResolver::new(&mapper).resolve(prediction, first_frame);
    debug!(
        video = video_name,
        tracks = identities.len(),
        background = identities.background_count(),
        "resolved track identities"
    );

    let evaluator = ConsistencyEvaluator::new(&mapper, config.radius_table());
    let stride = frame_stride(ground_truth.len(), prediction.num_frames());
    let mut aggregator = ScoreAggregator::new(video_name, config.point_log());
    let mut frames_scored = 0;

    for frame_index in 0..prediction.num_frames() {
        let ground_truth_index = frame_index * stride;
        let Some(frame) = ground_truth.get(ground_truth_index) else {
            debug!(
                video = video_name,
                frame = frame_index,
                ground_truth_index,
                "ground truth exhausted, stopping"
            );
            break;
        };

        for (k, point) in prediction.frame(frame_index).points().enumerate() {
            let identity = identities.get(k);
            let outcome = evaluator.evaluate(&point, identity, frame);
            aggregator.add_point(frame_index, k, identity, &point, &outcome);
        }
        aggregator.finish_frame(frame_index);
        frames_scored += 1;
    }

    let evaluation = aggregator.finish(frames_scored);
    debug!(
        video = video_name,
        frames = frames_scored,
        attempted = evaluation.score().attempted(),
        percentage = evaluation.score().percentage(),
        "scored video"
    );
    Ok(VideoOutcome::Scored(evaluation))
}

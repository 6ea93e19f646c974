use crate::{Identity, PointOutcome, TrackPoint, VideoEvaluation, VideoOutcome};
use indexmap::IndexMap;
use serde::Serialize;

/// Mean consistency of all tracks assigned to one object in one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyRecord {
    /// Name of the video
    video_name: String,
    /// Prediction frame index
    frame: usize,
    /// Ground truth object id, `0` for background tracks
    object_id: u32,
    /// Mean point score
    score: f64,
}

impl ConsistencyRecord {
    /// Returns a new ConsistencyRecord
    pub fn new(video_name: String, frame: usize, object_id: u32, score: f64) -> ConsistencyRecord {
        ConsistencyRecord {
            video_name,
            frame,
            object_id,
            score,
        }
    }

    /// Returns the video name
    pub fn video_name(&self) -> &str {
        &self.video_name
    }

    /// Returns the prediction frame index
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Returns the object id
    pub fn object_id(&self) -> u32 {
        self.object_id
    }

    /// Returns the mean score
    pub fn score(&self) -> f64 {
        self.score
    }
}

/// Overall consistency of one video, as a percentage of the attempted points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoScore {
    video_name: String,
    percentage: f64,
    score_sum: f64,
    attempted: usize,
}

impl VideoScore {
    /// Returns a new VideoScore, `0` percent when no point was attempted.
    pub fn new(video_name: String, score_sum: f64, attempted: usize) -> VideoScore {
        let percentage = if attempted > 0 {
            100.0 * score_sum / attempted as f64
        } else {
            0.0
        };
        VideoScore {
            video_name,
            percentage,
            score_sum,
            attempted,
        }
    }

    /// Returns the video name
    pub fn video_name(&self) -> &str {
        &self.video_name
    }

    /// Returns the percentage in `[0, 100]`
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// Returns the sum of point scores
    pub fn score_sum(&self) -> f64 {
        self.score_sum
    }

    /// Returns the number of points that entered the denominator
    pub fn attempted(&self) -> usize {
        self.attempted
    }
}

/// Status column of the per point log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointStatus {
    Exact,
    Radius,
    OffScreenRecovered,
    Miss,
    OffScreen,
    OutsideGroundTruth,
    NonFinite,
}

impl From<&PointOutcome> for PointStatus {
    fn from(outcome: &PointOutcome) -> Self {
        match outcome {
            PointOutcome::Exact => PointStatus::Exact,
            PointOutcome::Radius {
                off_screen: false, ..
            } => PointStatus::Radius,
            PointOutcome::Radius {
                off_screen: true, ..
            } => PointStatus::OffScreenRecovered,
            PointOutcome::Miss => PointStatus::Miss,
            PointOutcome::OffScreen => PointStatus::OffScreen,
            PointOutcome::OutsideGroundTruth => PointStatus::OutsideGroundTruth,
            PointOutcome::NonFinite => PointStatus::NonFinite,
        }
    }
}

/// One row of the flat per point log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointLogEntry {
    video_name: String,
    frame: usize,
    point: usize,
    object_id: u32,
    x: f32,
    y: f32,
    confidence: f32,
    status: PointStatus,
    radius: Option<u32>,
    score: Option<f64>,
}

impl PointLogEntry {
    /// Returns the point index
    pub fn point(&self) -> usize {
        self.point
    }

    /// Returns the prediction frame index
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Returns the status
    pub fn status(&self) -> PointStatus {
        self.status
    }

    /// Returns the score, `None` for excluded points
    pub fn score(&self) -> Option<f64> {
        self.score
    }
    /// Returns the tracker confidence of the point
    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// Accumulates point scores of a single video.
///
/// Scores are bucketed per object while a frame is open and flushed into [`ConsistencyRecord`]s by
/// [`ScoreAggregator::finish_frame`]. The running totals cover the whole video.
#[derive(Debug)]
pub struct ScoreAggregator {
    video_name: String,
    score_sum: f64,
    attempted: usize,
    /// Point scores of the open frame by object id, in first-seen order.
    frame_scores: IndexMap<u32, Vec<f64>>,
    records: Vec<ConsistencyRecord>,
    point_log: Option<Vec<PointLogEntry>>,
}

impl ScoreAggregator {
    /// Returns a new ScoreAggregator
    ///
    /// # Parameters
    ///
    /// * `video_name`: Name stamped on every record.
    /// * `point_log`: Whether to keep one [`PointLogEntry`] per added point.
    pub fn new(video_name: impl Into<String>, point_log: bool) -> ScoreAggregator {
        ScoreAggregator {
            video_name: video_name.into(),
            score_sum: 0.0,
            attempted: 0,
            frame_scores: IndexMap::new(),
            records: vec![],
            point_log: point_log.then(Vec::new),
        }
    }

    /// Add the outcome of one point in the open frame. Excluded points only reach the point log.
    ///
    /// # Parameters
    ///
    /// * `frame`: Prediction frame index.
    /// * `point_index`: Index `k` of the track.
    /// * `identity`: Identity of the track, its object id keys the frame bucket.
    /// * `point`: The raw predicted position.
    /// * `outcome`: The evaluated outcome.
    pub fn add_point(
        &mut self,
        frame: usize,
        point_index: usize,
        identity: Identity,
        point: &TrackPoint,
        outcome: &PointOutcome,
    ) {
        let score = outcome.score();
        if let Some(score) = score {
            self.score_sum += score;
            self.attempted += 1;
            self.frame_scores
                .entry(identity.object_id())
                .or_default()
                .push(score);
        }

        if let Some(point_log) = self.point_log.as_mut() {
            let radius = match outcome {
                PointOutcome::Radius { radius, .. } => Some(*radius),
                _ => None,
            };
            point_log.push(PointLogEntry {
                video_name: self.video_name.clone(),
                frame,
                point: point_index,
                object_id: identity.object_id(),
                x: point.x(),
                y: point.y(),
                confidence: point.confidence(),
                status: outcome.into(),
                radius,
                score,
            });
        }
    }

    /// Close the open frame, emitting one record per object that scored at least one point.
    pub fn finish_frame(&mut self, frame: usize) {
        let video_name = &self.video_name;
        self.records.extend(self.frame_scores.drain(..).map(|(object_id, scores)| {
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            ConsistencyRecord::new(video_name.clone(), frame, object_id, mean)
        }));
    }

    /// Returns the sum of point scores so far
    pub fn score_sum(&self) -> f64 {
        self.score_sum
    }

    /// Returns the number of attempted points so far
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// Returns the records of the closed frames
    pub fn records(&self) -> &[ConsistencyRecord] {
        &self.records
    }

    /// Consume the aggregator into the video result. A frame that was never closed adds no record.
    pub fn finish(self, frames_scored: usize) -> VideoEvaluation {
        let score = VideoScore::new(self.video_name, self.score_sum, self.attempted);
        VideoEvaluation::new(
            self.records,
            score,
            self.point_log.unwrap_or_default(),
            frames_scored,
        )
    }
}

/// Unweighted mean of per video percentages, `0` for no videos.
pub fn overall_average(scores: &[VideoScore]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|score| score.percentage()).sum::<f64>() / scores.len() as f64
}

/// Roll up of a benchmark run over several videos.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSummary {
    /// Score of every scored video, in input order.
    video_scores: Vec<VideoScore>,
    /// Unweighted mean of the video percentages.
    overall_average: f64,
    /// Mean of all consistency records of all videos.
    mean_record_score: f64,
    /// Mean of the consistency records of each video.
    video_record_means: Vec<(String, f64)>,
    /// Names of the skipped videos.
    skipped: Vec<String>,
}

impl BenchmarkSummary {
    /// Summarise the outcomes of a run.
    pub fn from_outcomes(outcomes: &[VideoOutcome]) -> BenchmarkSummary {
        let mut video_scores = vec![];
        let mut video_record_means = vec![];
        let mut skipped = vec![];
        let mut record_sum = 0.0;
        let mut record_count = 0usize;

        for outcome in outcomes {
            match outcome {
                VideoOutcome::Scored(evaluation) => {
                    let records = evaluation.records();
                    let sum = records.iter().map(|record| record.score()).sum::<f64>();
                    record_sum += sum;
                    record_count += records.len();
                    let mean = if records.is_empty() {
                        0.0
                    } else {
                        sum / records.len() as f64
                    };
                    video_record_means.push((evaluation.score().video_name().to_string(), mean));
                    video_scores.push(evaluation.score().clone());
                }
                VideoOutcome::Skipped { video_name, .. } => skipped.push(video_name.clone()),
            }
        }

        BenchmarkSummary {
            overall_average: overall_average(&video_scores),
            mean_record_score: if record_count > 0 {
                record_sum / record_count as f64
            } else {
                0.0
            },
            video_scores,
            video_record_means,
            skipped,
        }
    }

    /// Returns the video scores
    pub fn video_scores(&self) -> &[VideoScore] {
        &self.video_scores
    }

    /// Returns the unweighted mean of the video percentages
    pub fn overall_average(&self) -> f64 {
        self.overall_average
    }

    /// Returns the mean of all records
    pub fn mean_record_score(&self) -> f64 {
        self.mean_record_score
    }

    /// Returns the per video mean of records
    pub fn video_record_means(&self) -> &[(String, f64)] {
        &self.video_record_means
    }

    /// Returns the skipped video names
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }
}

#[cfg(test)]
mod tests {
    use crate::*;
    use assert_approx_eq::assert_approx_eq;

    fn point() -> TrackPoint {
        TrackPoint::new(1.0, 1.0, 1.0)
    }

    #[test]
    fn zero_attempted_is_zero_percent() {
        let score = VideoScore::new("empty".to_string(), 0.0, 0);
        assert_eq!(score.percentage(), 0.0);

        let evaluation = ScoreAggregator::new("empty", false).finish(0);
        assert_eq!(evaluation.score().attempted(), 0);
        assert_eq!(evaluation.score().percentage(), 0.0);
        assert!(evaluation.records().is_empty());
    }

    #[test]
    fn records_per_frame_and_object() {
        let a = Identity::from_object_id(3);
        let b = Identity::from_object_id(8);
        let mut aggregator = ScoreAggregator::new("video_01", false);

        aggregator.add_point(0, 0, a, &point(), &PointOutcome::Exact);
        aggregator.add_point(0, 1, b, &point(), &PointOutcome::Miss);
        aggregator.add_point(
            0,
            2,
            a,
            &point(),
            &PointOutcome::Radius {
                radius: 3,
                score: 0.8,
                off_screen: false,
            },
        );
        aggregator.finish_frame(0);

        // only object 8 scores in frame 1, object 3 is off screen
        aggregator.add_point(1, 0, a, &point(), &PointOutcome::OffScreen);
        aggregator.add_point(1, 1, b, &point(), &PointOutcome::Exact);
        aggregator.finish_frame(1);

        assert_eq!(aggregator.attempted(), 4);
        assert_approx_eq!(aggregator.score_sum(), 2.8);

        let records = aggregator.records();
        assert_eq!(records.len(), 3);
        assert_eq!((records[0].frame(), records[0].object_id()), (0, 3));
        assert_approx_eq!(records[0].score(), 0.9);
        assert_eq!((records[1].frame(), records[1].object_id()), (0, 8));
        assert_eq!(records[1].score(), 0.0);
        assert_eq!((records[2].frame(), records[2].object_id()), (1, 8));
        assert_eq!(records[2].score(), 1.0);

        let evaluation = aggregator.finish(2);
        assert_approx_eq!(evaluation.score().percentage(), 70.0);
    }

    #[test]
    fn point_log() {
        let mut aggregator = ScoreAggregator::new("video_01", true);
        aggregator.add_point(0, 0, Identity::Background, &point(), &PointOutcome::OffScreen);
        aggregator.add_point(
            0,
            1,
            Identity::from_object_id(2),
            &point(),
            &PointOutcome::Radius {
                radius: 1,
                score: 0.99,
                off_screen: true,
            },
        );
        aggregator.finish_frame(0);
        let evaluation = aggregator.finish(1);

        let log = evaluation.point_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].status(), PointStatus::OffScreen);
        assert_eq!(log[0].score(), None);
        assert_eq!(log[0].confidence(), 1.0);
        assert_eq!(log[1].status(), PointStatus::OffScreenRecovered);
        assert_eq!(log[1].score(), Some(0.99));
        // excluded points never form a record
        assert_eq!(evaluation.records().len(), 1);
        assert_eq!(evaluation.records()[0].object_id(), 2);
    }

    #[test]
    fn unweighted_average() {
        let scores = vec![
            VideoScore::new("many".to_string(), 1000.0, 1000),
            VideoScore::new("few".to_string(), 0.0, 2),
        ];
        assert_eq!(scores[0].percentage(), 100.0);
        assert_eq!(overall_average(&scores), 50.0);
        assert_eq!(overall_average(&[]), 0.0);
    }

    #[test]
    fn summary_skips() {
        let mut aggregator = ScoreAggregator::new("video_01", false);
        aggregator.add_point(0, 0, Identity::from_object_id(1), &point(), &PointOutcome::Exact);
        aggregator.finish_frame(0);
        let outcomes = vec![
            VideoOutcome::Scored(aggregator.finish(1)),
            VideoOutcome::Skipped {
                video_name: "video_02".to_string(),
                reason: "missing predictions".to_string(),
            },
        ];

        let summary = BenchmarkSummary::from_outcomes(&outcomes);
        assert_eq!(summary.video_scores().len(), 1);
        assert_eq!(summary.overall_average(), 100.0);
        assert_eq!(summary.mean_record_score(), 1.0);
        assert_eq!(summary.video_record_means(), &[("video_01".to_string(), 1.0)]);
        assert_eq!(summary.skipped(), &["video_02".to_string()]);
    }
}

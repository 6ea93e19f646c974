#[macro_use]
extern crate lazy_static;

mod aggregator;
mod config;
mod consistency;
mod coordinate_mapper;
mod ground_truth;
mod identity;
mod prediction;
mod scorer;

pub use aggregator::{
    overall_average, BenchmarkSummary, ConsistencyRecord, PointLogEntry, PointStatus,
    ScoreAggregator, VideoScore,
};
pub use config::{RadiusTable, ScorerConfig, DEFAULT_RADIUS_SCORES};
pub use consistency::{ConsistencyEvaluator, PointOutcome};
pub use coordinate_mapper::{frame_stride, map_point, scale_factors, CoordinateMapper};
pub use ground_truth::{GroundTruthFrame, GroundTruthSequence, MaskEncoding, Palette};
pub use identity::{Identity, IdentityAssignment, IdentityResolver};
pub use prediction::{Prediction, PredictionFrame, Track, TrackPoint};
pub use scorer::{score_video, VideoEvaluation, VideoOutcome};

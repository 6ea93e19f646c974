use crate::{CoordinateMapper, GroundTruthFrame, Identity, RadiusTable, TrackPoint};

/// Result of testing one predicted point against one ground truth frame.
///
/// * `Exact` means the mapped pixel belongs to the track's object.
/// * `Radius` means the neighbourhood search found the object at `radius`. `off_screen` is set when the raw point was outside the prediction space.
/// * `Miss` means an in-bounds point found nothing, it still counts with a zero score.
/// * `OffScreen`, `OutsideGroundTruth` and `NonFinite` points are not scored at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointOutcome {
    Exact,
    Radius {
        radius: u32,
        score: f64,
        off_screen: bool,
    },
    Miss,
    OffScreen,
    OutsideGroundTruth,
    NonFinite,
}

impl PointOutcome {
    /// Returns the score of a counted point, `None` when the point is excluded from the denominator.
    pub fn score(&self) -> Option<f64> {
        match self {
            PointOutcome::Exact => Some(1.0),
            PointOutcome::Radius { score, .. } => Some(*score),
            PointOutcome::Miss => Some(0.0),
            PointOutcome::OffScreen
            | PointOutcome::OutsideGroundTruth
            | PointOutcome::NonFinite => None,
        }
    }

    /// Whether the point enters the attempted count
    pub fn is_counted(&self) -> bool {
        self.score().is_some()
    }
}

/// Decides how consistent a predicted point is with the ground truth object its track was assigned to.
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyEvaluator<'a> {
    mapper: &'a CoordinateMapper,
    radius_table: &'a RadiusTable,
}

impl<'a> ConsistencyEvaluator<'a> {
    /// Returns a new ConsistencyEvaluator
    ///
    /// # Parameters
    ///
    /// * `mapper`: Maps prediction coordinates onto the ground truth raster.
    /// * `radius_table`: Scores and scan order of the neighbourhood search.
    pub fn new(
        mapper: &'a CoordinateMapper,
        radius_table: &'a RadiusTable,
    ) -> ConsistencyEvaluator<'a> {
        ConsistencyEvaluator {
            mapper,
            radius_table,
        }
    }

    /// Score one point of a track against a ground truth frame.
    ///
    /// # Parameters
    ///
    /// * `point`: The raw predicted position in prediction space.
    /// * `identity`: The identity assigned to the point's track.
    /// * `frame`: The ground truth frame matching the prediction frame.
    pub fn evaluate(
        &self,
        point: &TrackPoint,
        identity: Identity,
        frame: &GroundTruthFrame,
    ) -> PointOutcome {
        if !point.is_finite() {
            return PointOutcome::NonFinite;
        }

        let (x, y) = self.mapper.map(point);

        if !self.mapper.in_prediction_bounds(point) {
            return match self.radius_search(x, y, identity, frame) {
                Some((radius, score)) => PointOutcome::Radius {
                    radius,
                    score,
                    off_screen: true,
                },
                None => PointOutcome::OffScreen,
            };
        }

        if !frame.contains(x, y) {
            return PointOutcome::OutsideGroundTruth;
        }

        let (px, py) = (x as usize, y as usize);
        if frame.is_foreground(px, py) && identity.matches(frame.object_id(px, py)) {
            return PointOutcome::Exact;
        }

        match self.radius_search(x, y, identity, frame) {
            Some((radius, score)) => PointOutcome::Radius {
                radius,
                score,
                off_screen: false,
            },
            None => PointOutcome::Miss,
        }
    }

    /// Search the neighbourhood of `(x, y)` for a pixel of the track's object.
    ///
    /// Radii are visited in increasing order and offsets in row-major order. The first foreground pixel
    /// carrying the object id decides the result, so a closer pixel of another object never shadows it
    /// and a farther one never improves it.
    ///
    /// # Returns
    ///
    /// The `(radius, score)` of the first hit, `None` when no radius of the table matches.
    pub fn radius_search(
        &self,
        x: i64,
        y: i64,
        identity: Identity,
        frame: &GroundTruthFrame,
    ) -> Option<(u32, f64)> {
        if identity.is_background() {
            return None;
        }

        self.radius_table.iter().find_map(|(radius, score, offsets)| {
            offsets
                .iter()
                .filter_map(|(dx, dy)| Some((x.checked_add(*dx)?, y.checked_add(*dy)?)))
                .filter(|&(nx, ny)| frame.contains(nx, ny))
                .any(|(nx, ny)| {
                    let (nx, ny) = (nx as usize, ny as usize);
                    frame.is_foreground(nx, ny) && identity.matches(frame.object_id(nx, ny))
                })
                .then_some((radius, score))
        })
    }
}

use crate::TrackPoint;

/// Returns the multiplier that maps a prediction frame index onto a ground truth frame index.
///
/// The ratio is rounded half-to-even. A sequence without prediction frames maps with a stride of `1`.
///
/// # Parameters
///
/// * `num_ground_truth_frames`: Number of ground truth frames available.
/// * `num_prediction_frames`: Number of prediction frames.
pub fn frame_stride(num_ground_truth_frames: usize, num_prediction_frames: usize) -> usize {
    if num_prediction_frames == 0 {
        return 1;
    }
    (num_ground_truth_frames as f64 / num_prediction_frames as f64).round_ties_even() as usize
}

/// Returns the `(scale_x, scale_y)` factors from prediction space to ground truth space.
pub fn scale_factors(
    ground_truth_width: usize,
    ground_truth_height: usize,
    prediction_width: u32,
    prediction_height: u32,
) -> (f64, f64) {
    (
        ground_truth_width as f64 / prediction_width as f64,
        ground_truth_height as f64 / prediction_height as f64,
    )
}

/// Scale a prediction space coordinate into ground truth pixels, truncating towards zero.
///
/// The result may lie outside the ground truth raster, callers check bounds on both sides of the mapping.
pub fn map_point(x: f32, y: f32, scale_x: f64, scale_y: f64) -> (i64, i64) {
    ((x as f64 * scale_x) as i64, (y as f64 * scale_y) as i64)
}

/// Maps points of one video from the prediction resolution onto the ground truth resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    /// Width of the prediction space.
    prediction_width: u32,
    /// Height of the prediction space.
    prediction_height: u32,
    /// Width of the ground truth raster.
    ground_truth_width: usize,
    /// Height of the ground truth raster.
    ground_truth_height: usize,
    scale_x: f64,
    scale_y: f64,
}

impl CoordinateMapper {
    /// Returns a new CoordinateMapper
    ///
    /// # Parameters
    ///
    /// * `prediction_width`: Width of the fixed working resolution of the tracker.
    /// * `prediction_height`: Height of the fixed working resolution of the tracker.
    /// * `ground_truth_width`: Width of the ground truth masks.
    /// * `ground_truth_height`: Height of the ground truth masks.
    pub fn new(
        prediction_width: u32,
        prediction_height: u32,
        ground_truth_width: usize,
        ground_truth_height: usize,
    ) -> CoordinateMapper {
        let (scale_x, scale_y) = scale_factors(
            ground_truth_width,
            ground_truth_height,
            prediction_width,
            prediction_height,
        );
        CoordinateMapper {
            prediction_width,
            prediction_height,
            ground_truth_width,
            ground_truth_height,
            scale_x,
            scale_y,
        }
    }

    /// Returns the scale factors
    pub fn scale(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }

    /// Whether the raw point lies in `[0, width) x [0, height)` of the prediction space.
    pub fn in_prediction_bounds(&self, point: &TrackPoint) -> bool {
        point.x() >= 0.0
            && point.x() < self.prediction_width as f32
            && point.y() >= 0.0
            && point.y() < self.prediction_height as f32
    }

    /// Whether the mapped pixel lies inside the ground truth raster.
    pub fn in_ground_truth_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.ground_truth_width
            && (y as usize) < self.ground_truth_height
    }

    /// Map a point into ground truth pixels without any bounds check.
    pub fn map(&self, point: &TrackPoint) -> (i64, i64) {
        map_point(point.x(), point.y(), self.scale_x, self.scale_y)
    }

    /// Map a point that must be inside the prediction space onto a ground truth pixel.
    ///
    /// Returns `None` when the point is outside the prediction space or truncation pushed it outside the ground truth raster.
    pub fn to_ground_truth(&self, point: &TrackPoint) -> Option<(usize, usize)> {
        if !self.in_prediction_bounds(point) {
            return None;
        }
        let (x, y) = self.map(point);
        if self.in_ground_truth_bounds(x, y) {
            Some((x as usize, y as usize))
        } else {
            None
        }
    }
}

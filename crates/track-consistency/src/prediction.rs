use anyhow::{ensure, Result};
use ndarray::*;

/// A single predicted position `(x, y)` with the tracker confidence, in prediction-space pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    /// Horizontal coordinate.
    x: f32,
    /// Vertical coordinate.
    y: f32,
    /// Confidence reported by the upstream tracker. Not used for scoring.
    confidence: f32,
}

impl TrackPoint {
    /// Returns a new TrackPoint
    pub fn new(x: f32, y: f32, confidence: f32) -> TrackPoint {
        TrackPoint { x, y, confidence }
    }

    /// Returns the x of the point
    pub fn x(&self) -> f32 {
        self.x
    }

    /// Returns the y of the point
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Returns the confidence of the point
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Whether both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// The predicted tracks of one video, shaped `(num_prediction_frames, num_points, 3)` where the last axis is `(x, y, confidence)`.
#[derive(Debug, Clone)]
pub struct Prediction {
    points: Array3<f32>,
}

impl Prediction {
    /// Returns a new Prediction
    ///
    /// # Parameters
    ///
    /// * `points`: An array of shape `(frames, points, 3)`.
    pub fn new(points: Array3<f32>) -> Result<Prediction> {
        ensure!(
            points.shape()[2] == 3,
            "prediction last axis must be (x, y, confidence), got length {}",
            points.shape()[2]
        );
        Ok(Prediction { points })
    }

    /// Returns a new Prediction from a shape and a flat, row-major vector of values.
    ///
    /// # Parameters
    ///
    /// * `shape`: The array shape, which must have exactly three dimensions.
    /// * `values`: The flat values in C order.
    pub fn from_shape_vec(shape: &[usize], values: Vec<f32>) -> Result<Prediction> {
        ensure!(
            shape.len() == 3,
            "prediction must have 3 dimensions, got shape {:?}",
            shape
        );
        let points = Array3::from_shape_vec((shape[0], shape[1], shape[2]), values)?;
        Prediction::new(points)
    }

    /// Returns the number of prediction frames
    pub fn num_frames(&self) -> usize {
        self.points.shape()[0]
    }

    /// Returns the number of tracked points
    pub fn num_points(&self) -> usize {
        self.points.shape()[1]
    }

    /// Returns the point `k` at prediction frame `frame`.
    pub fn point(&self, frame: usize, k: usize) -> TrackPoint {
        let values = self.points.slice(s![frame, k, ..]);
        TrackPoint::new(values[0], values[1], values[2])
    }

    /// Returns every point at prediction frame `frame`.
    pub fn frame(&self, frame: usize) -> PredictionFrame<'_> {
        PredictionFrame {
            index: frame,
            points: self.points.index_axis(Axis(0), frame),
        }
    }

    /// Returns the track of point `k` across all prediction frames.
    pub fn track(&self, k: usize) -> Track<'_> {
        Track {
            point_index: k,
            points: self.points.index_axis(Axis(1), k),
        }
    }
}

/// All points of one prediction frame.
#[derive(Debug, Clone)]
pub struct PredictionFrame<'a> {
    index: usize,
    points: ArrayView2<'a, f32>,
}

impl<'a> PredictionFrame<'a> {
    /// Returns the prediction frame index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the number of points in the frame
    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    /// Whether the frame holds no points
    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    /// Returns the points in point index order.
    pub fn points(&self) -> impl Iterator<Item = TrackPoint> + 'a {
        let points = self.points.clone();
        (0..points.nrows())
            .map(move |k| TrackPoint::new(points[[k, 0]], points[[k, 1]], points[[k, 2]]))
    }
}

/// The positions of a single point index over every prediction frame.
#[derive(Debug, Clone)]
pub struct Track<'a> {
    point_index: usize,
    points: ArrayView2<'a, f32>,
}

impl<'a> Track<'a> {
    /// Returns the point index `k` of the track
    pub fn point_index(&self) -> usize {
        self.point_index
    }

    /// Returns the number of frames in the track
    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    /// Whether the track has no frames
    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    /// Returns the first position of the track, if any.
    pub fn first(&self) -> Option<TrackPoint> {
        self.positions().next()
    }

    /// Returns the positions in frame order.
    pub fn positions(&self) -> impl Iterator<Item = TrackPoint> + 'a {
        let points = self.points.clone();
        (0..points.nrows())
            .map(move |i| TrackPoint::new(points[[i, 0]], points[[i, 1]], points[[i, 2]]))
    }
}

#[cfg(test)]
mod tests {
    use crate::*;
    use anyhow::Result;
    use ndarray::*;

    #[test]
    fn rejects_wrong_last_axis() {
        assert!(Prediction::new(Array3::zeros((2, 1, 2))).is_err());
        assert!(Prediction::from_shape_vec(&[2, 3], vec![0.0; 6]).is_err());
        assert!(Prediction::from_shape_vec(&[1, 1, 3], vec![0.0; 4]).is_err());
    }

    #[test]
    fn frames_and_tracks() -> Result<()> {
        let prediction = Prediction::from_shape_vec(
            &[2, 2, 3],
            vec![
                1.0, 2.0, 0.5, //
                3.0, 4.0, 0.6, //
                5.0, 6.0, 0.7, //
                7.0, 8.0, 0.8,
            ],
        )?;
        assert_eq!(prediction.num_frames(), 2);
        assert_eq!(prediction.num_points(), 2);
        assert_eq!(prediction.point(1, 0), TrackPoint::new(5.0, 6.0, 0.7));

        let frame = prediction.frame(0);
        assert_eq!(frame.index(), 0);
        assert_eq!(
            frame.points().collect::<Vec<_>>(),
            vec![TrackPoint::new(1.0, 2.0, 0.5), TrackPoint::new(3.0, 4.0, 0.6)]
        );

        let track = prediction.track(1);
        assert_eq!(track.point_index(), 1);
        assert_eq!(track.len(), 2);
        assert_eq!(track.first(), Some(TrackPoint::new(3.0, 4.0, 0.6)));
        assert_eq!(
            track.positions().map(|p| p.y()).collect::<Vec<_>>(),
            vec![4.0, 8.0]
        );

        Ok(())
    }

    #[test]
    fn non_finite_points() {
        assert!(!TrackPoint::new(f32::NAN, 1.0, 1.0).is_finite());
        assert!(!TrackPoint::new(1.0, f32::INFINITY, 1.0).is_finite());
        assert!(TrackPoint::new(-4.0, 1.0, 1.0).is_finite());
    }
}

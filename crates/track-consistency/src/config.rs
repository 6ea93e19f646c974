use anyhow::{ensure, Result};
use std::collections::BTreeMap;

lazy_static! {
    /**
    Score granted to a point whose first matching pixel is found at a given search radius (in ground truth pixels).
    Decreases with distance, a point without any match within the largest radius scores zero.
    */
    pub static ref DEFAULT_RADIUS_SCORES: BTreeMap<u32, f64> = BTreeMap::from([
        (1, 0.99),
        (2, 0.90),
        (3, 0.80),
        (4, 0.50),
        (5, 0.30),
    ]);
}

/// Radius to score table of the neighbourhood search, with the integer offsets to visit at each radius.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusTable {
    /// Score for radius `r` at index `r - 1`.
    scores: Vec<f64>,
    /// Offsets `(dx, dy)` with `dx² + dy² <= r²` in row-major order, for radius `r` at index `r - 1`.
    offsets: Vec<Vec<(i64, i64)>>,
}

impl Default for RadiusTable {
    fn default() -> Self {
        Self::from_sorted(DEFAULT_RADIUS_SCORES.values().copied().collect())
    }
}

impl RadiusTable {
    /// Returns a new RadiusTable
    ///
    /// # Parameters
    ///
    /// * `entries`: `(radius, score)` pairs. Radii must cover `1..=n` without gaps and scores must lie in `[0, 1]`, strictly decreasing with radius.
    pub fn new<I>(entries: I) -> Result<RadiusTable>
    where
        I: IntoIterator<Item = (u32, f64)>,
    {
        let entries = entries.into_iter().collect::<BTreeMap<_, _>>();
        ensure!(!entries.is_empty(), "radius table must have at least one entry");

        let mut previous: Option<f64> = None;
        for (expected, (&radius, &score)) in (1u32..).zip(entries.iter()) {
            ensure!(
                radius == expected,
                "radius table must cover radii 1..={} without gaps, missing radius {}",
                entries.len(),
                expected
            );
            ensure!(
                (0.0..=1.0).contains(&score),
                "score {} for radius {} is outside [0, 1]",
                score,
                radius
            );
            if let Some(previous) = previous {
                ensure!(
                    score < previous,
                    "score {} for radius {} does not decrease from {}",
                    score,
                    radius,
                    previous
                );
            }
            previous = Some(score);
        }

        Ok(Self::from_sorted(entries.into_values().collect()))
    }

    fn from_sorted(scores: Vec<f64>) -> RadiusTable {
        let offsets = (1..=scores.len() as i64)
            .map(|radius| {
                let mut ring = vec![];
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        if dx * dx + dy * dy <= radius * radius {
                            ring.push((dx, dy));
                        }
                    }
                }
                ring
            })
            .collect();
        RadiusTable { scores, offsets }
    }

    /// Returns the largest search radius
    pub fn max_radius(&self) -> u32 {
        self.scores.len() as u32
    }

    /// Returns the score for `radius`, `None` outside `1..=max_radius`.
    pub fn score(&self, radius: u32) -> Option<f64> {
        radius
            .checked_sub(1)
            .and_then(|index| self.scores.get(index as usize))
            .copied()
    }

    /// Returns the offsets to visit at `radius` in scan order.
    pub fn offsets(&self, radius: u32) -> &[(i64, i64)] {
        radius
            .checked_sub(1)
            .and_then(|index| self.offsets.get(index as usize))
            .map(|ring| ring.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate `(radius, score, offsets)` by increasing radius.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64, &[(i64, i64)])> {
        self.scores
            .iter()
            .zip(self.offsets.iter())
            .enumerate()
            .map(|(index, (&score, ring))| (index as u32 + 1, score, ring.as_slice()))
    }
}

/// Parameters of the tracking consistency scorer.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Width of the fixed working resolution of the upstream tracker.
    prediction_width: u32,
    /// Height of the fixed working resolution of the upstream tracker.
    prediction_height: u32,
    /// Radius to score table of the neighbourhood search.
    radius_table: RadiusTable,
    /// Whether to keep one log entry per evaluated point.
    point_log: bool,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

impl ScorerConfig {
    /// Returns a new ScorerConfig
    ///
    /// # Parameters
    ///
    /// * `prediction_width`: Width of the prediction space. Default `336`.
    /// * `prediction_height`: Height of the prediction space. Default `336`.
    /// * `radius_table`: Radius to score table. Default [`DEFAULT_RADIUS_SCORES`].
    pub fn new(
        prediction_width: Option<u32>,
        prediction_height: Option<u32>,
        radius_table: Option<RadiusTable>,
    ) -> ScorerConfig {
        ScorerConfig {
            prediction_width: prediction_width.unwrap_or(336),
            prediction_height: prediction_height.unwrap_or(336),
            radius_table: radius_table.unwrap_or_default(),
            point_log: false,
        }
    }

    /// Set the prediction resolution
    pub fn with_prediction_resolution(&mut self, width: u32, height: u32) -> &mut Self {
        self.prediction_width = width;
        self.prediction_height = height;
        self
    }

    /// Set radius_table
    pub fn with_radius_table(&mut self, radius_table: RadiusTable) -> &mut Self {
        self.radius_table = radius_table;
        self
    }

    /// Set point_log
    pub fn with_point_log(&mut self, point_log: bool) -> &mut Self {
        self.point_log = point_log;
        self
    }

    /// Returns the prediction width
    pub fn prediction_width(&self) -> u32 {
        self.prediction_width
    }

    /// Returns the prediction height
    pub fn prediction_height(&self) -> u32 {
        self.prediction_height
    }

    /// Returns the radius table
    pub fn radius_table(&self) -> &RadiusTable {
        &self.radius_table
    }

    /// Whether a per point log is kept
    pub fn point_log(&self) -> bool {
        self.point_log
    }

    /// Check the configuration can be used for scoring.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.prediction_width > 0 && self.prediction_height > 0,
            "prediction resolution must be non-zero, got {}x{}",
            self.prediction_width,
            self.prediction_height
        );
        Ok(())
    }
}

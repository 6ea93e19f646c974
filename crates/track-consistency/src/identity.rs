use crate::{CoordinateMapper, GroundTruthFrame, Prediction, TrackPoint};
use std::num::NonZeroU32;

/// The ground truth object a track is expected to follow.
///
/// - `Object` carries a non-zero ground truth id.
/// - `Background` is the sentinel for tracks that started on background or outside the frame. It never matches any pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    Background,
    Object(NonZeroU32),
}

impl Identity {
    /// Returns the identity for a ground truth id, `0` being background.
    pub fn from_object_id(object_id: u32) -> Identity {
        NonZeroU32::new(object_id)
            .map(Identity::Object)
            .unwrap_or(Identity::Background)
    }

    /// Returns the ground truth id, `0` for background
    pub fn object_id(&self) -> u32 {
        match self {
            Identity::Background => 0,
            Identity::Object(id) => id.get(),
        }
    }

    /// Whether the identity is the background sentinel
    pub fn is_background(&self) -> bool {
        matches!(self, Identity::Background)
    }

    /// Whether a ground truth id belongs to this identity.
    pub fn matches(&self, object_id: u32) -> bool {
        match self {
            Identity::Background => false,
            Identity::Object(id) => id.get() == object_id,
        }
    }
}

/// Identity of every track, indexed by point index. Fixed once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAssignment {
    identities: Vec<Identity>,
}

impl IdentityAssignment {
    /// Returns the identity of track `k`, background for unknown tracks.
    pub fn get(&self, k: usize) -> Identity {
        self.identities
            .get(k)
            .copied()
            .unwrap_or(Identity::Background)
    }

    /// Returns the number of tracks
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Whether there are no tracks
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Returns the number of tracks holding the background sentinel
    pub fn background_count(&self) -> usize {
        self.identities
            .iter()
            .filter(|identity| identity.is_background())
            .count()
    }
}

impl FromIterator<Identity> for IdentityAssignment {
    fn from_iter<T: IntoIterator<Item = Identity>>(iter: T) -> Self {
        IdentityAssignment {
            identities: iter.into_iter().collect(),
        }
    }
}

/// Assigns each track the ground truth object found under its first position.
///
/// Only the first prediction frame and the first ground truth frame are consulted, tracks are never re-identified later.
#[derive(Debug, Clone, Copy)]
pub struct IdentityResolver<'a> {
    mapper: &'a CoordinateMapper,
}

impl<'a> IdentityResolver<'a> {
    /// Returns a new IdentityResolver
    pub fn new(mapper: &'a CoordinateMapper) -> IdentityResolver<'a> {
        IdentityResolver { mapper }
    }

    /// Resolve the identity of a single first position.
    ///
    /// Points outside either space, or landing on background, get the background sentinel.
    pub fn resolve_point(&self, point: &TrackPoint, first_frame: &GroundTruthFrame) -> Identity {
        if !point.is_finite() {
            return Identity::Background;
        }
        match self.mapper.to_ground_truth(point) {
            Some((x, y)) => Identity::from_object_id(first_frame.object_id(x, y)),
            None => Identity::Background,
        }
    }

    /// Resolve the identity of every track of `prediction` from its first frame.
    ///
    /// # Parameters
    ///
    /// * `prediction`: The predicted tracks.
    /// * `first_frame`: The ground truth frame matching prediction frame 0.
    pub fn resolve(
        &self,
        prediction: &Prediction,
        first_frame: &GroundTruthFrame,
    ) -> IdentityAssignment {
        if prediction.num_frames() == 0 {
            return (0..prediction.num_points())
                .map(|_| Identity::Background)
                .collect();
        }
        prediction
            .frame(0)
            .points()
            .map(|point| self.resolve_point(&point, first_frame))
            .collect()
    }
}

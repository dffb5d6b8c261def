//! 2D–3D correspondence sets.
//!
//! A correspondence set pairs observed image points with known world points.
//! An empty set is valid and means "nothing visible"; solvers decide how many
//! points they need.

use crate::{Mat34, Pt2, Pt3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrespondenceError {
    #[error("screen / world point counts must match: {screen} vs {world}")]
    LengthMismatch { screen: usize, world: usize },
}

/// Observed image points paired with world points.
///
/// # Example
///
/// ```
/// use armarker_core::{CorrespondenceSet, Pt2, Pt3};
///
/// let mut set = CorrespondenceSet::default();
/// set.push(Pt2::new(320.0, 240.0), Pt3::new(0.0, 0.0, 0.0));
/// assert_eq!(set.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrespondenceSet {
    /// Observed image coordinates.
    pub screen: Vec<Pt2>,
    /// Corresponding world coordinates.
    pub world: Vec<Pt3>,
}

impl CorrespondenceSet {
    /// Construct a set, rejecting mismatched lengths.
    pub fn new(screen: Vec<Pt2>, world: Vec<Pt3>) -> Result<Self, CorrespondenceError> {
        if screen.len() != world.len() {
            return Err(CorrespondenceError::LengthMismatch {
                screen: screen.len(),
                world: world.len(),
            });
        }
        Ok(Self { screen, world })
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            screen: Vec::with_capacity(n),
            world: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, screen: Pt2, world: Pt3) {
        self.screen.push(screen);
        self.world.push(world);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.world.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    /// Iterate over (screen, world) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Pt2, &Pt3)> {
        self.screen.iter().zip(self.world.iter())
    }
}

/// Correspondences observed by the two cameras of a stereo pair.
///
/// Both sides reference the same world frame; their lengths are independent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StereoCorrespondenceSet {
    pub left: CorrespondenceSet,
    pub right: CorrespondenceSet,
}

impl StereoCorrespondenceSet {
    pub fn new(left: CorrespondenceSet, right: CorrespondenceSet) -> Self {
        Self { left, right }
    }

    /// Total number of correspondences over both cameras.
    pub fn len(&self) -> usize {
        self.left.len() + self.right.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// One captured view for stereo calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StereoCalibView {
    pub points: StereoCorrespondenceSet,
    /// Initial world-to-left-camera pose for this view.
    pub init_pose_left: Mat34,
}

//! Closed-form initialisation for square-marker pose estimation.
//!
//! - [`dlt_homography`]: normalized DLT plane-to-image homography,
//! - [`PlanarPoseSolver`]: homography decomposition into a rigid pose, and
//!   a direct world-to-camera initialiser for planar point sets,
//! - [`fit_plane`]: PCA plane fit used to detect planar layouts.
//!
//! These estimates seed the iterative refinement in `armarker-icp`.

use armarker_core::MatError;
use thiserror::Error;

mod homography;
pub mod math;
mod planar_pose;

pub use homography::*;
pub use planar_pose::*;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinearError {
    #[error("need at least {needed} point correspondences, got {got}")]
    NotEnoughPoints { needed: usize, got: usize },
    #[error("world / image point counts must match: {world} vs {image}")]
    LengthMismatch { world: usize, image: usize },
    #[error("degenerate point configuration")]
    Degenerate,
    #[error("points are not coplanar (normal variance ratio {ratio:.3e})")]
    NonPlanar { ratio: f64 },
    #[error("intrinsics matrix is not invertible")]
    SingularIntrinsics,
    #[error("svd failed")]
    SvdFailed,
    #[error(transparent)]
    Mat(#[from] MatError),
}

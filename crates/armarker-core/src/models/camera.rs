use serde::{Deserialize, Serialize};

use super::FxFyCxCySkew;
use crate::{pose_inverse, pose_mul, Mat3, Mat34, Pt2, Real, Vec3};

/// Smallest homogeneous depth accepted when projecting.
pub const MIN_PROJECTION_DEPTH: Real = 1e-9;

/// Pinhole camera described by its 3×4 projection matrix.
///
/// `mat` maps camera-frame points `Xc` to homogeneous image coordinates:
/// `u ~ mat · [Xc; 1]`. Detected corners are expected to be expressed in the
/// same (undistorted) image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraProjection {
    pub mat: Mat34,
}

impl CameraProjection {
    pub fn new(mat: Mat34) -> Self {
        Self { mat }
    }

    pub fn from_intrinsics(k: &FxFyCxCySkew<Real>) -> Self {
        Self {
            mat: k.projection_matrix(),
        }
    }

    /// Left 3×3 block of the projection matrix.
    pub fn k_matrix(&self) -> Mat3 {
        self.mat.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Project a camera-frame point; `None` when it lies on or behind the
    /// image plane.
    pub fn project(&self, p_c: &Vec3) -> Option<Pt2> {
        let h = self.mat.fixed_view::<3, 3>(0, 0) * p_c + self.mat.column(3);
        if h.z <= MIN_PROJECTION_DEPTH {
            return None;
        }
        Some(Pt2::new(h.x / h.z, h.y / h.z))
    }

    /// Projection matrix of the same camera seen through a rigid transform:
    /// `mat · [pose; 0 0 0 1]`.
    pub fn through(&self, pose: &Mat34) -> CameraProjection {
        let r = self.mat.fixed_view::<3, 3>(0, 0);
        let mut out = Mat34::zeros();
        out.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(r * pose.fixed_view::<3, 3>(0, 0)));
        let t = r * pose.column(3) + self.mat.column(3);
        out.set_column(3, &t);
        CameraProjection { mat: out }
    }
}

/// Calibrated stereo pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StereoCameras {
    pub left: CameraProjection,
    pub right: CameraProjection,
    /// Rigid transform from the left camera frame into the right camera frame.
    pub left_to_right: Mat34,
}

impl StereoCameras {
    pub fn new(left: CameraProjection, right: CameraProjection, left_to_right: Mat34) -> Self {
        Self {
            left,
            right,
            left_to_right,
        }
    }

    /// Right projection expressed against left-camera coordinates.
    pub fn right_from_left(&self) -> CameraProjection {
        self.right.through(&self.left_to_right)
    }

    /// World-to-right pose for a given world-to-left pose.
    pub fn right_pose(&self, left_pose: &Mat34) -> Mat34 {
        pose_mul(&self.left_to_right, left_pose)
    }

    /// World-to-left pose for a given world-to-right pose.
    pub fn left_pose(&self, right_pose: &Mat34) -> Mat34 {
        pose_mul(&pose_inverse(&self.left_to_right), right_pose)
    }
}

//! Gauss-Newton building blocks shared by every ICP solver.
//!
//! Poses are world-to-camera [`Mat34`] transforms. Updates are 6-vectors
//! `[ω; δt]` of a left-multiplied increment, linearised as
//! `Xc' = Xc + ω × Xc + δt`.

use armarker_core::{Mat, Mat26, Mat3, Mat34, Pt2, Pt3, Real, Vec2, Vec3, Vec6, Vector};
use nalgebra::{Matrix2x3, Matrix3x6, Rotation3};

use crate::IcpError;

/// Rotation blocks whose `‖RᵀR − I‖` exceeds this are re-orthonormalised.
pub const ORTHONORMAL_TOLERANCE: Real = 1e-9;

/// Depths at or below this are treated as behind the camera.
const MIN_DEPTH: Real = 1e-9;

/// `Xc = R·Xw + t`.
#[inline]
pub fn world_to_camera(pose: &Mat34, xw: &Pt3) -> Vec3 {
    pose.fixed_view::<3, 3>(0, 0) * xw.coords + pose.column(3)
}

/// Project a camera-frame point with a 3×4 projection matrix.
pub fn project(mat_xc2u: &Mat34, xc: &Vec3) -> Result<Pt2, IcpError> {
    let h = mat_xc2u.fixed_view::<3, 3>(0, 0) * xc + mat_xc2u.column(3);
    if h.z <= MIN_DEPTH {
        return Err(IcpError::BehindCamera);
    }
    Ok(Pt2::new(h.x / h.z, h.y / h.z))
}

/// Derivative of the projection of `xw` w.r.t. a pose increment `[ω; δt]`.
pub fn jacobian_u_s(mat_xc2u: &Mat34, pose: &Mat34, xw: &Pt3) -> Result<Mat26, IcpError> {
    let xc = world_to_camera(pose, xw);
    let p = mat_xc2u.fixed_view::<3, 3>(0, 0);
    let h = p * xc + mat_xc2u.column(3);
    if h.z <= MIN_DEPTH {
        return Err(IcpError::BehindCamera);
    }

    let h2 = h.z * h.z;
    let mut du_dxc = Matrix2x3::<Real>::zeros();
    for c in 0..3 {
        du_dxc[(0, c)] = (p[(0, c)] * h.z - h.x * p[(2, c)]) / h2;
        du_dxc[(1, c)] = (p[(1, c)] * h.z - h.y * p[(2, c)]) / h2;
    }

    let mut dxc_ds = Matrix3x6::<Real>::zeros();
    dxc_ds
        .fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&(-xc.cross_matrix()));
    dxc_ds
        .fixed_view_mut::<3, 3>(0, 3)
        .copy_from(&Mat3::identity());

    Ok(du_dxc * dxc_ds)
}

/// Row-stacked linear system `J·δs ≈ du` assembled one point at a time.
#[derive(Debug, Clone)]
pub struct StackedSystem {
    cols: usize,
    j: Vec<Real>,
    du: Vec<Real>,
}

impl StackedSystem {
    pub fn new(cols: usize) -> Self {
        Self {
            cols,
            j: Vec::new(),
            du: Vec::new(),
        }
    }

    pub fn with_capacity(cols: usize, points: usize) -> Self {
        Self {
            cols,
            j: Vec::with_capacity(points * 2 * cols),
            du: Vec::with_capacity(points * 2),
        }
    }

    /// Number of stacked scalar rows.
    pub fn rows(&self) -> usize {
        self.du.len()
    }

    /// Append the two rows of one point. `blocks` places 2×6 Jacobian blocks
    /// at the given parameter offsets; both rows and the residual are scaled
    /// by `weight`.
    pub fn push(&mut self, blocks: &[(usize, &Mat26)], du: Vec2, weight: Real) {
        for r in 0..2 {
            let start = self.j.len();
            self.j.resize(start + self.cols, 0.0);
            for (offset, block) in blocks {
                for c in 0..6 {
                    self.j[start + offset + c] = block[(r, c)] * weight;
                }
            }
            self.du.push(du[r] * weight);
        }
    }

    /// Solve `(JᵀJ) δs = Jᵀ du` with the [`Mat`] kernel.
    pub fn solve(&self) -> Result<Vector, IcpError> {
        let j = Mat::from_row_slice(self.rows(), self.cols, &self.j)?;
        let du = Vector::from_slice(&self.du)?;
        Ok(normal_solve(&j, &du)?)
    }
}

fn normal_solve(j: &Mat, du: &Vector) -> Result<Vector, armarker_core::MatError> {
    let jt = j.transpose()?;
    let mut jtj = jt.mul(j)?;
    jtj.invert_in_place()?;
    let jtdu = jt.mul_vec(du)?;
    jtj.mul_vec(&jtdu)
}

/// Solve the 6-parameter normal equations for stacked Jacobian rows.
pub fn delta_s(du: &Vector, j_us: &Mat) -> Result<Vec6, IcpError> {
    if j_us.cols() != 6 {
        return Err(IcpError::Mat(armarker_core::MatError::DimensionMismatch {
            op: "delta_s",
            lhs: j_us.shape(),
            rhs: (du.len(), 1),
        }));
    }
    let ds = normal_solve(j_us, du)?;
    Ok(Vec6::from_column_slice(ds.as_slice()))
}

/// Apply a left-multiplied increment to `pose`.
///
/// The rotation part uses the exact exponential map. The rotation block is
/// re-orthonormalised when its defect exceeds [`ORTHONORMAL_TOLERANCE`].
pub fn update_pose(pose: &Mat34, ds: &Vec6) -> Mat34 {
    let omega = Vec3::new(ds[0], ds[1], ds[2]);
    let dt = Vec3::new(ds[3], ds[4], ds[5]);
    let dr = Rotation3::new(omega).into_inner();

    let r = dr * pose.fixed_view::<3, 3>(0, 0);
    let t = dr * pose.column(3) + dt;

    let mut out = Mat34::zeros();
    out.fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&orthonormalize(r));
    out.set_column(3, &t);
    out
}

/// Nearest rotation (SVD projection) when `r` has drifted off SO(3).
pub fn orthonormalize(r: Mat3) -> Mat3 {
    let defect = (r.transpose() * r - Mat3::identity()).norm();
    if defect <= ORTHONORMAL_TOLERANCE {
        return r;
    }
    let svd = r.svd(true, true);
    match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => {
            let mut out = u * v_t;
            if out.determinant() < 0.0 {
                let mut u_flipped = u;
                u_flipped.column_mut(2).neg_mut();
                out = u_flipped * v_t;
            }
            out
        }
        _ => r,
    }
}

/// One observed image point tied to a world point and the projection
/// (expressed against the pose's camera frame) that observes it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Observation<'a> {
    pub mat: &'a Mat34,
    pub screen: &'a Pt2,
    pub world: &'a Pt3,
}

impl Observation<'_> {
    /// Squared reprojection error under `pose`.
    pub fn error2(&self, pose: &Mat34) -> Result<(Real, Vec2), IcpError> {
        let u = project(self.mat, &world_to_camera(pose, self.world))?;
        let du = self.screen - u;
        Ok((du.norm_squared(), du))
    }
}

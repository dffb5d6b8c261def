use armarker_core::{
    mat::pca, CameraProjection, Iso3, Mat, Mat3, Mat34, Pt2, Pt3, Real, Vec3,
};
use log::debug;
use nalgebra::{Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};

use crate::{dlt_homography, LinearError};

/// Largest normal-to-total variance ratio still treated as planar.
pub const PLANARITY_TOLERANCE: Real = 1e-6;

/// Linear pose initialisation from a homography and intrinsics.
///
/// This implements the classic decomposition of a plane-induced homography
/// `H` into a rotation and translation, assuming the target lies on the plane
/// `Z = 0` in its own coordinates.
#[derive(Debug, Clone, Copy)]
pub struct PlanarPoseSolver;

impl PlanarPoseSolver {
    /// Decompose a homography into a pose `T_C_B` given intrinsics `K`.
    pub fn from_homography(kmtx: &Mat3, hmtx: &Mat3) -> Result<Iso3, LinearError> {
        let k_inv = kmtx.try_inverse().ok_or(LinearError::SingularIntrinsics)?;

        let h1 = hmtx.column(0);
        let h2 = hmtx.column(1);
        let h3 = hmtx.column(2).into_owned();

        let k_inv_h1 = k_inv * h1;
        let k_inv_h2 = k_inv * h2;

        // Scale factor λ: average of the first two column norms.
        let norm1 = k_inv_h1.norm();
        let norm2 = k_inv_h2.norm();
        if norm1 + norm2 <= Real::EPSILON {
            return Err(LinearError::Degenerate);
        }
        let mut lambda = 1.0 / ((norm1 + norm2) * 0.5);

        // The plane must end up in front of the camera.
        if (k_inv * h3).z < 0.0 {
            lambda = -lambda;
        }

        let r1 = (lambda * k_inv_h1).into_owned();
        let r2 = (lambda * k_inv_h2).into_owned();
        let r3 = r1.cross(&r2);

        let mut r_mat = Matrix3::<Real>::zeros();
        r_mat.set_column(0, &r1);
        r_mat.set_column(1, &r2);
        r_mat.set_column(2, &r3);

        // Project onto SO(3) (polar decomposition via SVD)
        let svd = r_mat.svd(true, true);
        let u = svd.u.ok_or(LinearError::SvdFailed)?;
        let v_t = svd.v_t.ok_or(LinearError::SvdFailed)?;
        let mut r_orth = u * v_t;

        if r_orth.determinant() < 0.0 {
            let mut u_flipped = u;
            u_flipped.column_mut(2).neg_mut();
            r_orth = u_flipped * v_t;
        }

        Ok(build_iso(r_orth, lambda, &k_inv, &h3))
    }

    /// World-to-camera pose of a planar point set seen by `camera`.
    ///
    /// The world points may lie on any plane; they are mapped into the
    /// plane's principal frame before the homography is estimated. A
    /// non-zero translation column in the projection matrix is accounted for.
    pub fn from_points(
        camera: &CameraProjection,
        screen: &[Pt2],
        world: &[Pt3],
    ) -> Result<Mat34, LinearError> {
        if screen.len() != world.len() {
            return Err(LinearError::LengthMismatch {
                world: world.len(),
                image: screen.len(),
            });
        }
        if world.len() < 4 {
            return Err(LinearError::NotEnoughPoints {
                needed: 4,
                got: world.len(),
            });
        }

        let plane = fit_plane(world)?;
        if plane.planarity > PLANARITY_TOLERANCE {
            return Err(LinearError::NonPlanar {
                ratio: plane.planarity,
            });
        }

        let local: Vec<Pt2> = world
            .iter()
            .map(|p| {
                let q = plane.to_local(p);
                Pt2::new(q.x, q.y)
            })
            .collect();
        let hmtx = dlt_homography(&local, screen)?;

        let kmtx = camera.k_matrix();
        let iso = Self::from_homography(&kmtx, &hmtx)?;
        let k_inv = kmtx.try_inverse().ok_or(LinearError::SingularIntrinsics)?;
        let offset = k_inv * camera.mat.column(3);

        let r = iso.rotation.to_rotation_matrix().into_inner() * plane.axes;
        let t = iso.translation.vector - offset - r * plane.centroid.coords;

        debug!(
            "planar init from {} points: t = [{:.3}, {:.3}, {:.3}]",
            world.len(),
            t.x,
            t.y,
            t.z
        );

        let mut pose = Mat34::zeros();
        pose.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
        pose.set_column(3, &t);
        Ok(pose)
    }
}

fn build_iso(r_orth: Matrix3<Real>, lambda: Real, k_inv: &Mat3, h3: &Vector3<Real>) -> Iso3 {
    let t_vec: Vector3<Real> = (lambda * (k_inv * h3)).into_owned();

    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_orth));
    let trans = Translation3::from(t_vec);

    Iso3::from_parts(trans, rot)
}

/// Principal plane of a 3D point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneFit {
    pub centroid: Pt3,
    /// Rows: first and second in-plane axes, then the unit normal.
    /// Right-handed.
    pub axes: Mat3,
    pub normal: Vec3,
    /// Variance along the normal divided by the total variance.
    /// Zero for perfectly planar input.
    pub planarity: Real,
}

impl PlaneFit {
    /// Coordinates of `p` in the plane frame; `z` is the signed distance.
    pub fn to_local(&self, p: &Pt3) -> Vec3 {
        self.axes * (p - self.centroid)
    }
}

/// Fit a plane through `points` by principal-component analysis.
///
/// Needs at least 3 points that are not collinear.
pub fn fit_plane(points: &[Pt3]) -> Result<PlaneFit, LinearError> {
    if points.len() < 3 {
        return Err(LinearError::NotEnoughPoints {
            needed: 3,
            got: points.len(),
        });
    }

    let mut samples = Mat::zeros(points.len(), 3)?;
    for (i, p) in points.iter().enumerate() {
        samples[(i, 0)] = p.x;
        samples[(i, 1)] = p.y;
        samples[(i, 2)] = p.z;
    }
    let result = pca(&samples)?;

    let v = result.variances.as_slice();
    let total: Real = v.iter().sum();
    if total <= Real::EPSILON || v[1] <= total * Real::EPSILON {
        return Err(LinearError::Degenerate);
    }

    let axis = |r: usize| Vec3::new(result.axes[(r, 0)], result.axes[(r, 1)], result.axes[(r, 2)]);
    let e1 = axis(0);
    let e2 = axis(1);
    let normal = e1.cross(&e2).normalize();

    let mut axes = Mat3::zeros();
    axes.set_row(0, &e1.transpose());
    axes.set_row(1, &e2.transpose());
    axes.set_row(2, &normal.transpose());

    let mean = result.mean.as_slice();
    Ok(PlaneFit {
        centroid: Pt3::new(mean[0], mean[1], mean[2]),
        axes,
        normal,
        planarity: v[2] / total,
    })
}

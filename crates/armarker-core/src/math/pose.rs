//! Rigid 3×4 transforms.
//!
//! Poses are stored as `[R | t]` blocks ([`Mat34`]) mapping points from a
//! source frame into a target frame, e.g. world into camera. Composition and
//! inversion assume the rotation block is orthonormal.

use super::{Iso3, Mat3, Mat34, Mat4, Pt3, Real, Vec3};
use nalgebra::{Rotation3, Translation3, UnitQuaternion};

/// Apply `pose` to a point: `R p + t`.
#[inline]
pub fn transform_point(pose: &Mat34, p: &Pt3) -> Pt3 {
    let r = pose.fixed_view::<3, 3>(0, 0);
    let t = pose.column(3);
    Pt3::from(r * p.coords + t)
}

/// Compose two rigid transforms: `a ∘ b` (apply `b` first).
pub fn pose_mul(a: &Mat34, b: &Mat34) -> Mat34 {
    let ra = a.fixed_view::<3, 3>(0, 0);
    let rb = b.fixed_view::<3, 3>(0, 0);
    let r = ra * rb;
    let t = ra * b.column(3) + a.column(3);
    let mut out = Mat34::zeros();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    out.set_column(3, &t);
    out
}

/// Inverse of a rigid transform: `[Rᵀ | -Rᵀ t]`.
pub fn pose_inverse(pose: &Mat34) -> Mat34 {
    let rt = pose.fixed_view::<3, 3>(0, 0).transpose();
    let t = -(rt * pose.column(3));
    let mut out = Mat34::zeros();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(&rt);
    out.set_column(3, &t);
    out
}

/// Embed a 3×4 transform into a homogeneous 4×4 matrix.
pub fn pose_to_homogeneous(pose: &Mat34) -> Mat4 {
    let mut out = Mat4::identity();
    out.fixed_view_mut::<3, 4>(0, 0).copy_from(pose);
    out
}

/// Convert an isometry into a 3×4 transform.
pub fn pose_from_iso(iso: &Iso3) -> Mat34 {
    let h = iso.to_homogeneous();
    h.fixed_view::<3, 4>(0, 0).into_owned()
}

/// Convert a 3×4 transform into an isometry.
///
/// The rotation block is projected onto SO(3), so slightly non-orthonormal
/// inputs are accepted.
pub fn pose_to_iso(pose: &Mat34) -> Iso3 {
    let r: Mat3 = pose.fixed_view::<3, 3>(0, 0).into_owned();
    let rot = Rotation3::from_matrix(&r);
    let t: Vec3 = pose.column(3).into_owned();
    Iso3::from_parts(Translation3::from(t), UnitQuaternion::from_rotation_matrix(&rot))
}

/// Geodesic angle (radians) between the rotation blocks of two poses.
pub fn rotation_angle_between(a: &Mat34, b: &Mat34) -> Real {
    let ra = a.fixed_view::<3, 3>(0, 0);
    let rb = b.fixed_view::<3, 3>(0, 0);
    let diff = ra.transpose() * rb;
    ((diff.trace() - 1.0) * 0.5).clamp(-1.0, 1.0).acos()
}

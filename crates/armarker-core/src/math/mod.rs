//! Mathematical utilities and type definitions.
//!
//! This module provides the fixed-size geometry types used throughout the
//! workspace and helpers for rigid 3×4 transforms.

use nalgebra::{Isometry3, Matrix2x6, Matrix3, Matrix3x4, Matrix4, Point2, Point3, Vector2, Vector3, Vector6};

pub mod pose;

pub use pose::{
    pose_from_iso, pose_inverse, pose_mul, pose_to_homogeneous, pose_to_iso,
    rotation_angle_between, transform_point,
};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 6D vector, used for pose increments `[ω; δt]`.
pub type Vec6 = Vector6<Real>;
/// 2D point with [`Real`] coordinates.
pub type Pt2 = Point2<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 4×4 matrix with [`Real`] entries.
pub type Mat4 = Matrix4<Real>;
/// 3×4 matrix: rigid transforms `[R | t]` and camera projection matrices.
pub type Mat34 = Matrix3x4<Real>;
/// 2×6 Jacobian of an image point w.r.t. a pose increment.
pub type Mat26 = Matrix2x6<Real>;
/// 3D rigid transform (SE(3)) using [`Real`].
pub type Iso3 = Isometry3<Real>;

/// Convert a 2D point in Euclidean coordinates into homogeneous coordinates.
///
/// Given a point `p = (x, y)`, returns the homogeneous vector `(x, y, 1)`.
pub fn to_homogeneous(p: &Pt2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

/// Convert a 3D homogeneous vector back to a 2D point.
///
/// The input is interpreted as `(x, y, w)` and the result is `(x / w, y / w)`.
/// The caller is responsible for ensuring that `w != 0`.
pub fn from_homogeneous(v: &Vec3) -> Pt2 {
    Pt2::new(v.x / v.z, v.y / v.z)
}

/// Corners of a square marker of side `width`, centred on the origin in the
/// `Z = 0` plane.
///
/// Order: top-left, top-right, bottom-right, bottom-left (marker `+Y` up).
pub fn square_corners(width: Real) -> [Pt3; 4] {
    let h = width * 0.5;
    [
        Pt3::new(-h, h, 0.0),
        Pt3::new(h, h, 0.0),
        Pt3::new(h, -h, 0.0),
        Pt3::new(-h, -h, 0.0),
    ]
}

/// Area of a quadrilateral given by its corners in order (shoelace formula).
pub fn quad_area(corners: &[Pt2; 4]) -> Real {
    let mut acc = 0.0;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        acc += a.x * b.y - b.x * a.y;
    }
    acc.abs() * 0.5
}

//! Core math and geometry primitives for `armarker`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, `Mat34`, ...) and
//!   3×4 rigid-pose helpers,
//! - a small dense matrix kernel ([`Mat`], [`Vector`]) with inversion,
//!   determinant, symmetric eigen-decomposition and PCA,
//! - pinhole camera projections and stereo rigs ([`CameraProjection`],
//!   [`StereoCameras`]),
//! - correspondence containers consumed by the pose solvers,
//! - deterministic synthetic data helpers.
//!
//! Pose convention: a [`Mat34`] `[R | t]` maps points from the object frame
//! into the camera frame, `Xc = R·Xw + t`.

/// Dense matrix kernel.
pub mod mat;
/// Linear algebra type aliases and rigid-pose helpers.
pub mod math;
/// Camera models.
pub mod models;
/// Deterministic synthetic data helpers.
pub mod synthetic;
/// Correspondence containers.
pub mod types;

pub use mat::{Mat, MatError, Vector};
pub use math::*;
pub use models::*;
pub use types::*;

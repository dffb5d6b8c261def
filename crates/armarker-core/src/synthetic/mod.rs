//! Deterministic synthetic data generation helpers.
//!
//! Small building blocks for synthetic marker scenes used in tests and
//! examples:
//! - square marker corner layouts and composite marker grids,
//! - pose constructors,
//! - projection helpers producing image points,
//! - deterministic pseudo-random pixel noise.
//!
//! # Example
//!
//! ```
//! use armarker_core::{synthetic::marker, CameraProjection, FxFyCxCySkew};
//!
//! let k = FxFyCxCySkew { fx: 800.0, fy: 800.0, cx: 320.0, cy: 240.0, skew: 0.0 };
//! let cam = CameraProjection::from_intrinsics(&k);
//! let pose = marker::pose_from_euler((0.1, -0.2, 0.05), (0.0, 0.0, 400.0));
//! let corners = marker::square_corners(80.0);
//! let px = marker::project_points(&cam, &pose, &corners).unwrap();
//! assert_eq!(px.len(), 4);
//! ```

pub mod marker;
pub mod noise;

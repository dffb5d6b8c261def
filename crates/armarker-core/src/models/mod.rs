//! Camera models.
//!
//! The marker solvers work with a plain pinhole projection: a 3×4 matrix
//! mapping camera-frame points to image coordinates. Lens distortion is
//! removed upstream by the marker detector.

mod camera;
mod intrinsics;

pub use camera::*;
pub use intrinsics::*;

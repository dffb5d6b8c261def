//! ICP-style Gauss-Newton pose refinement.
//!
//! - [`core`]: projection, Jacobian, normal-equation solve and pose update,
//! - [`icp_point`] / [`icp_point_robust`]: monocular refinement,
//! - [`icp_stereo_point`] / [`icp_stereo_point_robust`]: refinement of a
//!   world-to-left pose from both cameras of a calibrated rig,
//! - [`calib_stereo`]: joint refinement of a rig's left-to-right transform.
//!
//! All error figures are mean squared reprojection residuals in pixels².
//! The robust variants weight residuals with a Tukey biweight whose scale
//! follows the residual distribution ([`RobustKernel`]).

mod calib_stereo;
pub mod core;
mod error;
mod options;
mod point;
mod robust;
mod stereo;

pub use calib_stereo::*;
pub use error::IcpError;
pub use options::{IcpOptions, StereoCalibOptions};
pub use point::{icp_point, icp_point_robust, IcpReport, MIN_POINTS, MIN_POINTS_ROBUST};
pub use robust::{inlier_index, RobustKernel, MIN_TUKEY_K2};
pub use stereo::*;

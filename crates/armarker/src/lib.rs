//! Square-marker pose estimation and multi-marker fusion.
//!
//! The entry crate re-exports the workspace layers:
//!
//! - **[`core`]**: geometry types, the dense [`core::Mat`] kernel, camera
//!   projections and synthetic data helpers
//! - **[`linear`]**: homography and planar pose initialisation
//! - **[`icp`]**: Gauss-Newton pose refinement (mono, stereo, robust) and
//!   stereo extrinsic calibration
//! - **[`multi`]**: multi-marker configurations and fused pose solvers
//! - **[`track`]**: trackables, the square-marker tracker and a background
//!   tracking worker
//! - **[`prelude`]**: the types most programs need
//!
//! ```no_run
//! use armarker::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let camera = CameraProjection::from_intrinsics(&FxFyCxCySkew {
//!     fx: 800.0, fy: 800.0, cx: 320.0, cy: 240.0, skew: 0.0,
//! });
//! let mut config = MultiMarkerConfig::from_file("board.dat", &mut PatternIdTable::new())?;
//! let detections: Vec<MarkerDetection> = /* from the marker detector */
//! # Vec::new();
//! let est = multi_square_robust(&camera, &detections, &mut config, &MultiSolveOptions::default())?;
//! println!("pose error {:.3} from {} markers", est.error, est.visible.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Stability
//!
//! `armarker` is the public compatibility boundary. Lower-level crates are
//! intended for advanced usage and may evolve more quickly.

/// Geometry types, matrix kernel and camera models.
pub mod core {
    pub use armarker_core::*;
}

/// Closed-form initialisation (homography, planar pose, plane fitting).
pub mod linear {
    pub use armarker_linear::*;
}

/// Iterative pose refinement and stereo calibration.
pub mod icp {
    pub use armarker_icp::*;
}

/// Multi-marker configurations and fused pose solvers.
pub mod multi {
    pub use armarker_multi::*;
}

/// Trackables, trackers and the tracking worker.
pub mod track {
    pub use armarker_track::*;
}

/// Convenient re-exports for common use cases.
///
/// Import with `use armarker::prelude::*;`.
pub mod prelude {
    pub use crate::core::{
        CameraProjection, FxFyCxCySkew, Mat34, Pt2, Pt3, Real, StereoCameras, Vec3,
    };

    pub use crate::icp::{calib_stereo, IcpOptions, IcpReport, StereoCalibOptions};

    pub use crate::multi::{
        multi_square, multi_square_robust, multi_square_stereo, multi_square_stereo_robust,
        square_pose, MarkerDetection, MultiMarkerConfig, MultiPoseEstimate, MultiSolveOptions,
        PatternIdTable, PatternType,
    };

    pub use crate::track::{
        AnyTracker, Frame, Trackable, Tracker, TrackerCameras, TrackerConfig, TrackingWorker,
    };
}

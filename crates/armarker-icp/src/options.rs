use armarker_core::Real;
use serde::{Deserialize, Serialize};

/// Convergence policy of the ICP pose refinement loop.
///
/// Errors are mean squared reprojection residuals in pixels².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcpOptions {
    /// Maximum number of Gauss-Newton updates.
    pub max_loop: usize,
    /// Stop as soon as the error falls below this value.
    pub break_error: Real,
    /// Stop when `err_k / err_{k-1}` exceeds this ratio...
    pub break_ratio: Real,
    /// ...and the error is already below this value.
    pub break_ratio_error: Real,
    /// Expected fraction of inliers; sets the robust kernel scale.
    pub inlier_probability: Real,
}

impl Default for IcpOptions {
    fn default() -> Self {
        Self {
            max_loop: 10,
            break_error: 0.1,
            break_ratio: 0.99,
            break_ratio_error: 4.0,
            inlier_probability: 0.5,
        }
    }
}

impl IcpOptions {
    /// Whether the loop should stop at iteration `i` with current error
    /// `err` and previous error `prev`.
    pub(crate) fn should_stop(&self, i: usize, err: Real, prev: Real) -> bool {
        if err < self.break_error {
            return true;
        }
        if i > 0 && err < self.break_ratio_error && err / prev > self.break_ratio {
            return true;
        }
        i == self.max_loop
    }
}

/// Convergence policy of [`calib_stereo`](crate::calib_stereo).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoCalibOptions {
    pub max_loop: usize,
    pub break_error: Real,
    pub break_ratio: Real,
}

impl Default for StereoCalibOptions {
    fn default() -> Self {
        Self {
            max_loop: 100,
            break_error: 0.001,
            break_ratio: 0.99,
        }
    }
}

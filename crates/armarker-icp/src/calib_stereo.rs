//! Joint refinement of a stereo rig's left-to-right transform.

use armarker_core::{CameraProjection, Mat34, Real, StereoCalibView};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::{jacobian_u_s, project, update_pose, world_to_camera, StackedSystem};
use crate::point::{ds_vec6, MIN_POINTS};
use crate::{IcpError, StereoCalibOptions};

/// Outcome of [`calib_stereo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StereoCalibReport {
    /// Refined left-to-right camera transform.
    pub left_to_right: Mat34,
    /// Refined world-to-left pose of each view, in input order.
    pub view_poses: Vec<Mat34>,
    /// Final mean squared reprojection residual over both cameras.
    pub error: Real,
    pub iterations: usize,
    /// Error before each accepted update, then the final error.
    pub history: Vec<Real>,
}

/// Refine the left-to-right transform and every view pose by Gauss-Newton.
///
/// The parameter vector holds the left-to-right increment followed by one
/// increment per view (`6 + 6·N`). Views with fewer than three points in
/// either camera are left out and keep their initial pose. A step that
/// raises the error is rolled back and ends the loop.
pub fn calib_stereo(
    views: &[StereoCalibView],
    left: &CameraProjection,
    right: &CameraProjection,
    init_left_to_right: &Mat34,
    opts: &StereoCalibOptions,
) -> Result<StereoCalibReport, IcpError> {
    // Views too sparse to observe their own pose get no parameters.
    let active: Vec<usize> = (0..views.len())
        .filter(|&k| {
            let p = &views[k].points;
            p.left.len() >= MIN_POINTS && p.right.len() >= MIN_POINTS
        })
        .collect();
    if active.is_empty() {
        let got = views
            .iter()
            .map(|v| v.points.left.len().min(v.points.right.len()))
            .max()
            .unwrap_or(0);
        return Err(IcpError::TooFewPoints {
            needed: MIN_POINTS,
            got,
        });
    }
    if active.len() < views.len() {
        debug!(
            "calib_stereo: skipping {} views with fewer than {} points per camera",
            views.len() - active.len(),
            MIN_POINTS
        );
    }

    let total_points: usize = active.iter().map(|&k| views[k].points.len()).sum();
    let cols = 6 + 6 * active.len();

    let mut l2r = *init_left_to_right;
    let mut poses: Vec<Mat34> = views.iter().map(|v| v.init_pose_left).collect();
    let mut accepted = (l2r, poses.clone());
    let mut history = Vec::new();
    let mut err0 = 0.0;
    let mut i = 0;

    loop {
        let mut err1 = mean_error(views, &active, left, right, &l2r, &poses)?;

        let rolled_back = i > 0 && err1 > err0;
        if rolled_back {
            warn!(
                "calib_stereo: step {} raised error {:.6} -> {:.6}, rolling back",
                i, err0, err1
            );
            (l2r, poses) = accepted;
            err1 = err0;
            i -= 1;
        } else {
            history.push(err1);
        }

        let stop = rolled_back
            || err1 < opts.break_error
            || (i > 0 && err1 / err0 > opts.break_ratio)
            || i == opts.max_loop;
        if stop {
            debug!(
                "calib_stereo: {} views, {} iterations, error {:.6}",
                views.len(),
                i,
                err1
            );
            return Ok(StereoCalibReport {
                left_to_right: l2r,
                view_poses: poses,
                error: err1,
                iterations: i,
                history,
            });
        }
        err0 = err1;
        accepted = (l2r, poses.clone());

        let mut sys = StackedSystem::with_capacity(cols, total_points);
        let right_from_left = right.through(&l2r);
        for (slot, &k) in active.iter().enumerate() {
            let (view, pose) = (&views[k], &poses[k]);
            let off = 6 + 6 * slot;
            for (screen, world) in view.points.left.iter() {
                let u = project(&left.mat, &world_to_camera(pose, world))?;
                let jac = jacobian_u_s(&left.mat, pose, world)?;
                sys.push(&[(off, &jac)], screen - u, 1.0);
            }
            for (screen, world) in view.points.right.iter() {
                let xcl = world_to_camera(pose, world);
                let xcr = world_to_camera(&l2r, &xcl.into());
                let u = project(&right.mat, &xcr)?;
                let j_l2r = jacobian_u_s(&right.mat, &l2r, &xcl.into())?;
                let j_view = jacobian_u_s(&right_from_left.mat, pose, world)?;
                sys.push(&[(0, &j_l2r), (off, &j_view)], screen - u, 1.0);
            }
        }
        let ds = sys.solve()?;
        let s = ds.as_slice();
        l2r = update_pose(&l2r, &ds_vec6(s));
        for (slot, &k) in active.iter().enumerate() {
            let off = 6 + 6 * slot;
            poses[k] = update_pose(&poses[k], &ds_vec6(&s[off..]));
        }
        i += 1;
    }
}

fn mean_error(
    views: &[StereoCalibView],
    active: &[usize],
    left: &CameraProjection,
    right: &CameraProjection,
    l2r: &Mat34,
    poses: &[Mat34],
) -> Result<Real, IcpError> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for &k in active {
        let (view, pose) = (&views[k], &poses[k]);
        for (screen, world) in view.points.left.iter() {
            let u = project(&left.mat, &world_to_camera(pose, world))?;
            sum += (screen - u).norm_squared();
            n += 1;
        }
        for (screen, world) in view.points.right.iter() {
            let xcl = world_to_camera(pose, world);
            let u = project(&right.mat, &world_to_camera(l2r, &xcl.into()))?;
            sum += (screen - u).norm_squared();
            n += 1;
        }
    }
    Ok(if n == 0 { 0.0 } else { sum / n as Real })
}

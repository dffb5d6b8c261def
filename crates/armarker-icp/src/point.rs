//! Monocular ICP point solvers.

use armarker_core::{CameraProjection, CorrespondenceSet, Mat34, Real};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::{jacobian_u_s, update_pose, Observation, StackedSystem};
use crate::{IcpError, IcpOptions, RobustKernel};

/// Minimum correspondences for a plain solve.
pub const MIN_POINTS: usize = 3;
/// Minimum correspondences for a robust solve.
pub const MIN_POINTS_ROBUST: usize = 4;

/// Result of one ICP refinement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IcpReport {
    /// Refined world-to-camera pose.
    pub pose: Mat34,
    /// Mean squared reprojection residual (robust loss for robust solves).
    pub error: Real,
    /// Gauss-Newton updates applied.
    pub iterations: usize,
}

impl IcpReport {
    pub fn rms(&self) -> Real {
        self.error.max(0.0).sqrt()
    }
}

/// Refine `init` against a monocular correspondence set.
pub fn icp_point(
    camera: &CameraProjection,
    data: &CorrespondenceSet,
    init: &Mat34,
    opts: &IcpOptions,
) -> Result<IcpReport, IcpError> {
    let obs = observations(&camera.mat, data);
    refine(&obs, init, opts)
}

/// Tukey-weighted variant of [`icp_point`].
pub fn icp_point_robust(
    camera: &CameraProjection,
    data: &CorrespondenceSet,
    init: &Mat34,
    opts: &IcpOptions,
) -> Result<IcpReport, IcpError> {
    let obs = observations(&camera.mat, data);
    refine_robust(&obs, init, opts)
}

pub(crate) fn observations<'a>(mat: &'a Mat34, data: &'a CorrespondenceSet) -> Vec<Observation<'a>> {
    data.iter()
        .map(|(screen, world)| Observation { mat, screen, world })
        .collect()
}

pub(crate) fn refine(
    obs: &[Observation<'_>],
    init: &Mat34,
    opts: &IcpOptions,
) -> Result<IcpReport, IcpError> {
    if obs.len() < MIN_POINTS {
        return Err(IcpError::TooFewPoints {
            needed: MIN_POINTS,
            got: obs.len(),
        });
    }

    let mut pose = *init;
    let mut err0 = 0.0;
    let mut i = 0;
    let mut residuals = Vec::with_capacity(obs.len());
    loop {
        residuals.clear();
        let mut sum = 0.0;
        for o in obs {
            let (e2, du) = o.error2(&pose)?;
            sum += e2;
            residuals.push(du);
        }
        let err1 = sum / obs.len() as Real;

        if opts.should_stop(i, err1, err0) {
            debug!("icp: {} points, {} iterations, error {:.6}", obs.len(), i, err1);
            return Ok(IcpReport {
                pose,
                error: err1,
                iterations: i,
            });
        }
        err0 = err1;

        let mut sys = StackedSystem::with_capacity(6, obs.len());
        for (o, du) in obs.iter().zip(&residuals) {
            let jac = jacobian_u_s(o.mat, &pose, o.world)?;
            sys.push(&[(0, &jac)], *du, 1.0);
        }
        let ds = sys.solve()?;
        pose = update_pose(&pose, &ds_vec6(ds.as_slice()));
        i += 1;
    }
}

pub(crate) fn refine_robust(
    obs: &[Observation<'_>],
    init: &Mat34,
    opts: &IcpOptions,
) -> Result<IcpReport, IcpError> {
    if obs.len() < MIN_POINTS_ROBUST {
        return Err(IcpError::TooFewPoints {
            needed: MIN_POINTS_ROBUST,
            got: obs.len(),
        });
    }

    let mut pose = *init;
    let mut err0 = 0.0;
    let mut i = 0;
    let mut e2s = Vec::with_capacity(obs.len());
    let mut residuals = Vec::with_capacity(obs.len());
    loop {
        e2s.clear();
        residuals.clear();
        for o in obs {
            let (e2, du) = o.error2(&pose)?;
            e2s.push(e2);
            residuals.push(du);
        }
        let kernel = RobustKernel::tukey_from_residuals(&e2s, opts.inlier_probability);
        let err1 = e2s
            .iter()
            .map(|&e2| kernel.rho_and_weight(e2).0)
            .sum::<Real>()
            / obs.len() as Real;

        if opts.should_stop(i, err1, err0) {
            debug!(
                "icp robust: {} points, {} iterations, error {:.6}",
                obs.len(),
                i,
                err1
            );
            return Ok(IcpReport {
                pose,
                error: err1,
                iterations: i,
            });
        }
        err0 = err1;

        let mut sys = StackedSystem::with_capacity(6, obs.len());
        let mut inliers = 0;
        for ((o, du), &e2) in obs.iter().zip(&residuals).zip(&e2s) {
            let (_, w) = kernel.rho_and_weight(e2);
            if w <= 0.0 {
                continue;
            }
            let jac = jacobian_u_s(o.mat, &pose, o.world)?;
            sys.push(&[(0, &jac)], *du, w);
            inliers += 1;
        }
        if inliers < MIN_POINTS {
            return Err(IcpError::TooFewPoints {
                needed: MIN_POINTS,
                got: inliers,
            });
        }
        let ds = sys.solve()?;
        pose = update_pose(&pose, &ds_vec6(ds.as_slice()));
        i += 1;
    }
}

pub(crate) fn ds_vec6(s: &[Real]) -> armarker_core::Vec6 {
    armarker_core::Vec6::from_column_slice(&s[..6])
}

#[cfg(test)]
mod tests {
    use super::*;
    use armarker_core::{
        rotation_angle_between, synthetic::marker, FxFyCxCySkew, Pt3,
    };

    fn camera() -> CameraProjection {
        CameraProjection::from_intrinsics(&FxFyCxCySkew {
            fx: 800.0,
            fy: 800.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
        })
    }

    fn grid_points() -> Vec<Pt3> {
        marker::grid_layout(4, 3, 40.0)
            .iter()
            .map(|m| Pt3::new(m[(0, 3)], m[(1, 3)], 0.0))
            .collect()
    }

    fn dataset(gt: &Mat34) -> CorrespondenceSet {
        let world = grid_points();
        let screen = marker::project_points(&camera(), gt, &world).unwrap();
        CorrespondenceSet::new(screen, world).unwrap()
    }

    #[test]
    fn converges_from_perturbed_pose() {
        let gt = marker::pose_from_euler((0.2, -0.3, 0.1), (10.0, 20.0, 600.0));
        let init = marker::pose_from_euler((0.25, -0.25, 0.05), (0.0, 30.0, 630.0));
        let data = dataset(&gt);

        let opts = IcpOptions {
            break_error: 1e-12,
            max_loop: 30,
            ..IcpOptions::default()
        };
        let report = icp_point(&camera(), &data, &init, &opts).unwrap();
        assert!(report.error < 1e-12, "error {}", report.error);
        assert!((report.pose.column(3) - gt.column(3)).norm() < 1e-4);
        assert!(rotation_angle_between(&report.pose, &gt) < 1e-6);
    }

    #[test]
    fn exact_start_stops_immediately() {
        let gt = marker::pose_from_euler((0.0, 0.1, 0.0), (0.0, 0.0, 500.0));
        let report = icp_point(&camera(), &dataset(&gt), &gt, &IcpOptions::default()).unwrap();
        assert_eq!(report.iterations, 0);
        assert!(report.error < 1e-18);
    }

    #[test]
    fn too_few_points() {
        let mut data = dataset(&marker::pose_from_euler((0.0, 0.0, 0.0), (0.0, 0.0, 500.0)));
        data.screen.truncate(2);
        data.world.truncate(2);
        let err = icp_point(&camera(), &data, &Mat34::identity(), &IcpOptions::default());
        assert_eq!(err, Err(IcpError::TooFewPoints { needed: 3, got: 2 }));
    }

    #[test]
    fn robust_ignores_gross_outlier() {
        let gt = marker::pose_from_euler((0.1, -0.2, 0.0), (5.0, 0.0, 550.0));
        let mut data = dataset(&gt);
        data.screen[0].x += 80.0;
        data.screen[0].y -= 60.0;
        let init = marker::pose_from_euler((0.12, -0.18, 0.01), (0.0, 5.0, 560.0));
        let opts = IcpOptions {
            max_loop: 30,
            ..IcpOptions::default()
        };

        let plain = icp_point(&camera(), &data, &init, &opts).unwrap();
        let robust = icp_point_robust(&camera(), &data, &init, &opts).unwrap();

        let plain_t = (plain.pose.column(3) - gt.column(3)).norm();
        let robust_t = (robust.pose.column(3) - gt.column(3)).norm();
        assert!(robust_t < plain_t, "robust {robust_t} vs plain {plain_t}");
        assert!(robust_t < 0.5);
    }

    #[test]
    fn rms_is_sqrt_of_error() {
        let r = IcpReport {
            pose: Mat34::identity(),
            error: 9.0,
            iterations: 1,
        };
        assert_eq!(r.rms(), 3.0);
    }
}

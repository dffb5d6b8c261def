//! Stereo ICP point solvers.
//!
//! The pose being refined is world-to-left-camera. Right observations are
//! projected through `P_R · T_L2R`, so both cameras constrain the same six
//! parameters and the error is pooled over `numL + numR` points.

use armarker_core::{Mat34, StereoCameras, StereoCorrespondenceSet};

use crate::point::{observations, refine, refine_robust};
use crate::{IcpError, IcpOptions, IcpReport};

/// Refine a world-to-left pose against left and right correspondences.
pub fn icp_stereo_point(
    cameras: &StereoCameras,
    data: &StereoCorrespondenceSet,
    init_left: &Mat34,
    opts: &IcpOptions,
) -> Result<IcpReport, IcpError> {
    let right = cameras.right_from_left();
    let mut obs = observations(&cameras.left.mat, &data.left);
    obs.extend(observations(&right.mat, &data.right));
    refine(&obs, init_left, opts)
}

/// Tukey-weighted variant of [`icp_stereo_point`].
pub fn icp_stereo_point_robust(
    cameras: &StereoCameras,
    data: &StereoCorrespondenceSet,
    init_left: &Mat34,
    opts: &IcpOptions,
) -> Result<IcpReport, IcpError> {
    let right = cameras.right_from_left();
    let mut obs = observations(&cameras.left.mat, &data.left);
    obs.extend(observations(&right.mat, &data.right));
    refine_robust(&obs, init_left, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use armarker_core::{
        rotation_angle_between, synthetic::marker, CameraProjection, CorrespondenceSet,
        FxFyCxCySkew, Pt3,
    };

    fn rig() -> StereoCameras {
        let k = FxFyCxCySkew {
            fx: 750.0,
            fy: 750.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
        };
        let cam = CameraProjection::from_intrinsics(&k);
        let l2r = marker::pose_from_euler((0.0, -0.05, 0.0), (-100.0, 0.0, 0.0));
        StereoCameras::new(cam, cam, l2r)
    }

    fn split_view(rig: &StereoCameras, gt: &Mat34) -> StereoCorrespondenceSet {
        let world: Vec<Pt3> = marker::grid_layout(3, 3, 50.0)
            .iter()
            .map(|m| Pt3::new(m[(0, 3)], m[(1, 3)], 0.0))
            .collect();
        // Left sees the first two rows, right the last two.
        let (left_w, right_w) = (world[..6].to_vec(), world[3..].to_vec());
        let left_px = marker::project_points(&rig.left, gt, &left_w).unwrap();
        let right_px = marker::project_points(&rig.right, &rig.right_pose(gt), &right_w).unwrap();
        StereoCorrespondenceSet::new(
            CorrespondenceSet::new(left_px, left_w).unwrap(),
            CorrespondenceSet::new(right_px, right_w).unwrap(),
        )
    }

    #[test]
    fn stereo_recovers_pose() {
        let rig = rig();
        let gt = marker::pose_from_euler((0.3, 0.1, -0.2), (40.0, -10.0, 700.0));
        let init = marker::pose_from_euler((0.28, 0.12, -0.18), (30.0, 0.0, 680.0));
        let opts = IcpOptions {
            break_error: 1e-12,
            max_loop: 30,
            ..IcpOptions::default()
        };
        let report = icp_stereo_point(&rig, &split_view(&rig, &gt), &init, &opts).unwrap();
        assert!((report.pose.column(3) - gt.column(3)).norm() < 1e-4);
        assert!(rotation_angle_between(&report.pose, &gt) < 1e-6);
    }

    #[test]
    fn right_only_points_constrain_left_pose() {
        let rig = rig();
        let gt = marker::pose_from_euler((0.0, 0.2, 0.0), (0.0, 0.0, 650.0));
        let mut data = split_view(&rig, &gt);
        data.left = CorrespondenceSet::default();
        let init = marker::pose_from_euler((0.02, 0.18, 0.0), (5.0, 5.0, 640.0));
        let opts = IcpOptions {
            break_error: 1e-12,
            max_loop: 30,
            ..IcpOptions::default()
        };
        let report = icp_stereo_point(&rig, &data, &init, &opts).unwrap();
        assert!((report.pose.column(3) - gt.column(3)).norm() < 1e-3);
    }

    #[test]
    fn robust_stereo_rejects_outlier() {
        let rig = rig();
        let gt = marker::pose_from_euler((0.1, 0.0, 0.1), (0.0, 10.0, 600.0));
        let mut data = split_view(&rig, &gt);
        data.right.screen[2].x += 120.0;
        let init = marker::pose_from_euler((0.11, 0.01, 0.1), (3.0, 12.0, 610.0));
        let opts = IcpOptions {
            max_loop: 30,
            ..IcpOptions::default()
        };
        let plain = icp_stereo_point(&rig, &data, &init, &opts).unwrap();
        let robust = icp_stereo_point_robust(&rig, &data, &init, &opts).unwrap();
        let plain_t = (plain.pose.column(3) - gt.column(3)).norm();
        let robust_t = (robust.pose.column(3) - gt.column(3)).norm();
        assert!(robust_t < plain_t);
    }

    #[test]
    fn empty_stereo_set_is_rejected() {
        let rig = rig();
        let data = StereoCorrespondenceSet::default();
        assert!(matches!(
            icp_stereo_point(&rig, &data, &Mat34::identity(), &IcpOptions::default()),
            Err(IcpError::TooFewPoints { got: 0, .. })
        ));
    }
}

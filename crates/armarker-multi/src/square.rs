//! Pose of a single square marker.

use armarker_core::{square_corners, CameraProjection, CorrespondenceSet, Mat34, Real};
use armarker_icp::{icp_point, IcpOptions, IcpReport};
use armarker_linear::PlanarPoseSolver;

use crate::{MarkerDetection, MultiError};

fn correspondences(detection: &MarkerDetection, width: Real) -> CorrespondenceSet {
    let mut set = CorrespondenceSet::with_capacity(4);
    for (screen, world) in detection
        .ordered_corners()
        .into_iter()
        .zip(square_corners(width))
    {
        set.push(screen, world);
    }
    set
}

/// Marker-to-camera pose of one detected square of side `width`, from a
/// planar initial estimate refined by ICP.
pub fn square_pose(
    camera: &CameraProjection,
    detection: &MarkerDetection,
    width: Real,
    opts: &IcpOptions,
) -> Result<IcpReport, MultiError> {
    let data = correspondences(detection, width);
    let init = PlanarPoseSolver::from_points(camera, &data.screen, &data.world)?;
    Ok(icp_point(camera, &data, &init, opts)?)
}

/// Like [`square_pose`] but seeded with the previous frame's pose.
pub fn square_pose_cont(
    camera: &CameraProjection,
    detection: &MarkerDetection,
    width: Real,
    prev: &Mat34,
    opts: &IcpOptions,
) -> Result<IcpReport, MultiError> {
    let data = correspondences(detection, width);
    Ok(icp_point(camera, &data, prev, opts)?)
}

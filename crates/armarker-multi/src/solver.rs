//! Fused pose of a multi-marker composite.
//!
//! Every variant follows the same flow: match detections to constituents,
//! stack the corners of every visible constituent into one correspondence
//! set, estimate each constituent's own pose, then refine the fused pose
//! from the previous frame's pose and from the best single-marker pose,
//! keeping whichever converges to the lower error.

use armarker_core::{
    pose_mul, CameraProjection, CorrespondenceSet, Mat34, Real, StereoCameras,
    StereoCorrespondenceSet,
};
use armarker_icp::{
    icp_point, icp_point_robust, icp_stereo_point, icp_stereo_point_robust, IcpError, IcpOptions,
    IcpReport,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::matching::match_detections;
use crate::square::square_pose;
use crate::{MarkerDetection, MultiError, MultiMarkerConfig};

/// Solver tuning for the fused multi-marker solves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiSolveOptions {
    pub icp: IcpOptions,
    /// Single-marker poses above this error are flagged and not used as
    /// seeds while an unflagged marker is available.
    pub pose_error_cutoff_each: Real,
    /// Fused poses below this error seed the next frame.
    pub pose_error_cutoff_combined: Real,
}

impl Default for MultiSolveOptions {
    fn default() -> Self {
        Self {
            icp: IcpOptions::default(),
            pose_error_cutoff_each: 4.0,
            pose_error_cutoff_combined: 20.0,
        }
    }
}

/// Where the winning refinement started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seed {
    /// The previous frame's fused pose.
    Previous,
    /// The pose of the given constituent, mapped to the composite frame.
    Marker(usize),
}

/// Fused pose of a composite for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPoseEstimate {
    /// Composite-to-camera pose (left camera for stereo).
    pub pose: Mat34,
    /// Mean squared reprojection residual per correspondence.
    pub error: Real,
    /// Indices of the constituents that contributed.
    pub visible: Vec<usize>,
    pub seed: Seed,
    pub iterations: usize,
}

impl MultiPoseEstimate {
    pub fn rms(&self) -> Real {
        self.error.max(0.0).sqrt()
    }
}

#[derive(Clone, Copy)]
enum Views<'a> {
    Mono {
        camera: &'a CameraProjection,
        detections: &'a [MarkerDetection],
    },
    Stereo {
        cameras: &'a StereoCameras,
        left: &'a [MarkerDetection],
        right: &'a [MarkerDetection],
    },
}

impl<'a> Views<'a> {
    fn left(&self) -> &'a [MarkerDetection] {
        match *self {
            Views::Mono { detections, .. } => detections,
            Views::Stereo { left, .. } => left,
        }
    }

    fn right(&self) -> Option<&'a [MarkerDetection]> {
        match *self {
            Views::Mono { .. } => None,
            Views::Stereo { right, .. } => Some(right),
        }
    }

    fn left_camera(&self) -> &'a CameraProjection {
        match *self {
            Views::Mono { camera, .. } => camera,
            Views::Stereo { cameras, .. } => &cameras.left,
        }
    }
}

/// Fused monocular pose.
pub fn multi_square(
    camera: &CameraProjection,
    detections: &[MarkerDetection],
    config: &mut MultiMarkerConfig,
    opts: &MultiSolveOptions,
) -> Result<MultiPoseEstimate, MultiError> {
    solve(config, Views::Mono { camera, detections }, false, opts)
}

/// Fused monocular pose with Tukey down-weighting of outlying corners.
pub fn multi_square_robust(
    camera: &CameraProjection,
    detections: &[MarkerDetection],
    config: &mut MultiMarkerConfig,
    opts: &MultiSolveOptions,
) -> Result<MultiPoseEstimate, MultiError> {
    solve(config, Views::Mono { camera, detections }, true, opts)
}

/// Fused world-to-left pose from both cameras of a calibrated rig.
pub fn multi_square_stereo(
    cameras: &StereoCameras,
    left: &[MarkerDetection],
    right: &[MarkerDetection],
    config: &mut MultiMarkerConfig,
    opts: &MultiSolveOptions,
) -> Result<MultiPoseEstimate, MultiError> {
    solve(
        config,
        Views::Stereo {
            cameras,
            left,
            right,
        },
        false,
        opts,
    )
}

/// Robust variant of [`multi_square_stereo`].
pub fn multi_square_stereo_robust(
    cameras: &StereoCameras,
    left: &[MarkerDetection],
    right: &[MarkerDetection],
    config: &mut MultiMarkerConfig,
    opts: &MultiSolveOptions,
) -> Result<MultiPoseEstimate, MultiError> {
    solve(
        config,
        Views::Stereo {
            cameras,
            left,
            right,
        },
        true,
        opts,
    )
}

/// Single-marker pose of a visible constituent, in the left camera frame.
struct MarkerPose {
    index: usize,
    pose: Mat34,
    area: Real,
    flagged: bool,
}

fn solve(
    config: &mut MultiMarkerConfig,
    views: Views<'_>,
    robust: bool,
    opts: &MultiSolveOptions,
) -> Result<MultiPoseEstimate, MultiError> {
    let visible = match_detections(config, views.left(), views.right());
    let required = config.min_submarker().max(1);
    if visible < required {
        config.prev_valid = false;
        return Err(MultiError::InsufficientVisibleMarkers { visible, required });
    }

    let data = correspondences(config, &views);
    let mut failure = None;
    let marker_poses = marker_poses(config, &views, opts, &mut failure);

    let mut seeds = Vec::with_capacity(2);
    if config.prev_valid {
        seeds.push((Seed::Previous, config.trans));
    }
    if let Some(best) = seed_marker(&marker_poses) {
        let itrans = config.markers()[best.index].itrans;
        seeds.push((Seed::Marker(best.index), pose_mul(&best.pose, &itrans)));
    }

    let mut winner: Option<(Seed, IcpReport)> = None;
    for (seed, init) in seeds {
        match refine(&views, &data, &init, robust, &opts.icp) {
            Ok(report) => {
                debug!("seed {:?}: error {:.6}", seed, report.error);
                if winner.as_ref().map_or(true, |(_, w)| report.error < w.error) {
                    winner = Some((seed, report));
                }
            }
            Err(e) => {
                warn!("seed {:?} failed: {}", seed, e);
                if failure.is_none() {
                    failure = Some(MultiError::from(e));
                }
            }
        }
    }

    let Some((seed, report)) = winner else {
        return Err(failure.unwrap_or(MultiError::InsufficientVisibleMarkers {
            visible,
            required,
        }));
    };

    config.trans = report.pose;
    config.prev_valid = report.error < opts.pose_error_cutoff_combined;
    debug!(
        "fused {} of {} markers: error {:.6}, seed {:?}",
        visible,
        config.len(),
        report.error,
        seed
    );

    Ok(MultiPoseEstimate {
        pose: report.pose,
        error: report.error,
        visible: config.visible_markers(),
        seed,
        iterations: report.iterations,
    })
}

/// Corners of every matched constituent paired with their composite
/// coordinates. Mono solves only fill `left`.
fn correspondences(config: &MultiMarkerConfig, views: &Views<'_>) -> StereoCorrespondenceSet {
    let left = stacked(config, views.left(), false);
    let right = views
        .right()
        .map(|r| stacked(config, r, true))
        .unwrap_or_default();
    StereoCorrespondenceSet::new(left, right)
}

fn stacked(config: &MultiMarkerConfig, detections: &[MarkerDetection], right: bool) -> CorrespondenceSet {
    let mut set = CorrespondenceSet::default();
    for m in config.markers() {
        let matched = if right { m.visible_right } else { m.visible };
        if let Some(d) = matched {
            for (screen, world) in detections[d].ordered_corners().into_iter().zip(m.pos3d) {
                set.push(screen, world);
            }
        }
    }
    set
}

fn marker_poses(
    config: &mut MultiMarkerConfig,
    views: &Views<'_>,
    opts: &MultiSolveOptions,
    failure: &mut Option<MultiError>,
) -> Vec<MarkerPose> {
    let mut out = Vec::new();
    for (index, m) in config.markers_mut().iter_mut().enumerate() {
        let solved = match (m.visible, m.visible_right, views) {
            (Some(d), _, _) => {
                let det = &views.left()[d];
                square_pose(views.left_camera(), det, m.width, &opts.icp).map(|r| (r, det.area))
            }
            (None, Some(d), Views::Stereo { cameras, right, .. }) => {
                let det = &right[d];
                square_pose(&cameras.right, det, m.width, &opts.icp).map(|mut r| {
                    r.pose = cameras.left_pose(&r.pose);
                    (r, det.area)
                })
            }
            _ => continue,
        };

        match solved {
            Ok((report, area)) => {
                m.pose_error = Some(report.error);
                m.flagged = report.error > opts.pose_error_cutoff_each;
                if m.flagged {
                    debug!("marker {index} flagged: error {:.3}", report.error);
                }
                out.push(MarkerPose {
                    index,
                    pose: report.pose,
                    area,
                    flagged: m.flagged,
                });
            }
            Err(e) => {
                warn!("marker {index}: no single-marker pose: {e}");
                m.flagged = true;
                if failure.is_none() {
                    *failure = Some(e);
                }
            }
        }
    }
    out
}

/// Largest-area unflagged marker, or the largest overall when all are
/// flagged.
fn seed_marker(poses: &[MarkerPose]) -> Option<&MarkerPose> {
    let largest = |flagged_ok: bool| {
        poses
            .iter()
            .filter(|p| flagged_ok || !p.flagged)
            .max_by(|a, b| a.area.total_cmp(&b.area))
    };
    largest(false).or_else(|| largest(true))
}

fn refine(
    views: &Views<'_>,
    data: &StereoCorrespondenceSet,
    init: &Mat34,
    robust: bool,
    opts: &IcpOptions,
) -> Result<IcpReport, IcpError> {
    match *views {
        Views::Mono { camera, .. } if robust => icp_point_robust(camera, &data.left, init, opts),
        Views::Mono { camera, .. } => icp_point(camera, &data.left, init, opts),
        Views::Stereo { cameras, .. } if robust => icp_stereo_point_robust(cameras, data, init, opts),
        Views::Stereo { cameras, .. } => icp_stereo_point(cameras, data, init, opts),
    }
}

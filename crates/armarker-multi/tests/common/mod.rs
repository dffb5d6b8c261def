#![allow(dead_code)]

use armarker_core::{
    pose_mul, synthetic::marker, synthetic::noise::GaussianPixelNoise, CameraProjection,
    FxFyCxCySkew, Mat34, Pt2, StereoCameras,
};
use armarker_multi::{MarkerDescriptor, MarkerDetection, MultiMarkerConfig, PatternType};

pub const WIDTH: f64 = 60.0;

pub fn camera() -> CameraProjection {
    CameraProjection::from_intrinsics(&FxFyCxCySkew {
        fx: 820.0,
        fy: 820.0,
        cx: 320.0,
        cy: 240.0,
        skew: 0.0,
    })
}

pub fn rig() -> StereoCameras {
    let l2r = marker::pose_from_euler((0.0, -0.1, 0.0), (-150.0, 0.0, 0.0));
    StereoCameras::new(camera(), camera(), l2r)
}

/// `nx × ny` grid of matrix markers with ids `0..nx*ny`.
pub fn grid_config(nx: usize, ny: usize) -> MultiMarkerConfig {
    let markers = marker::grid_layout(nx, ny, 100.0)
        .into_iter()
        .enumerate()
        .map(|(i, t)| MarkerDescriptor::new(i as i32, PatternType::Matrix, WIDTH, t))
        .collect();
    MultiMarkerConfig::new(markers).expect("valid grid")
}

/// Noise-free detections of every constituent seen through `pose`, with
/// varying corner rotation.
pub fn detect_all(
    config: &MultiMarkerConfig,
    camera: &CameraProjection,
    pose: &Mat34,
) -> Vec<MarkerDetection> {
    config
        .markers()
        .iter()
        .enumerate()
        .map(|(i, m)| detect(m, camera, pose).rotated(i % 4))
        .collect()
}

pub fn detect(m: &MarkerDescriptor, camera: &CameraProjection, pose: &Mat34) -> MarkerDetection {
    let px = marker::project_points(camera, pose, &m.pos3d).expect("projectable");
    MarkerDetection::new(m.pattern_type, m.pattern_id, [px[0], px[1], px[2], px[3]])
}

pub fn add_noise(dets: &mut [MarkerDetection], sigma: f64, seed: u64) {
    let noise = GaussianPixelNoise {
        seed,
        sigma_px: sigma,
    };
    for (i, d) in dets.iter_mut().enumerate() {
        for (j, c) in d.corners.iter_mut().enumerate() {
            *c = noise.apply(i, j, *c);
        }
    }
}

pub fn shift(det: &mut MarkerDetection, dx: f64, dy: f64) {
    for c in det.corners.iter_mut() {
        *c = Pt2::new(c.x + dx, c.y + dy);
    }
}

pub fn translation_error(a: &Mat34, b: &Mat34) -> f64 {
    (a.column(3) - b.column(3)).norm()
}

pub fn ground_truth() -> Mat34 {
    marker::pose_from_euler((0.35, -0.25, 0.2), (20.0, -10.0, 900.0))
}

pub fn right_pose(rig: &StereoCameras, left: &Mat34) -> Mat34 {
    pose_mul(&rig.left_to_right, left)
}

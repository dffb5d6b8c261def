//! Fused pose of a synthetic 3x2 marker board, with and without an
//! outlying constituent.
//!
//! Run with `cargo run -p armarker --example multi_synthetic`.

use anyhow::{Context, Result};
use armarker::core::synthetic::{marker, noise::GaussianPixelNoise};
use armarker::core::{pose_mul, rotation_angle_between};
use armarker::multi::MarkerDescriptor;
use armarker::prelude::*;

fn main() -> Result<()> {
    let camera = CameraProjection::from_intrinsics(&FxFyCxCySkew {
        fx: 900.0,
        fy: 900.0,
        cx: 640.0,
        cy: 360.0,
        skew: 0.0,
    });
    let width = 40.0;
    let layout = marker::grid_layout(3, 2, 60.0);
    let markers: Vec<MarkerDescriptor> = layout
        .iter()
        .enumerate()
        .map(|(i, trans)| MarkerDescriptor::new(i as i32, PatternType::Matrix, width, *trans))
        .collect();
    let mut config = MultiMarkerConfig::new(markers).context("board configuration")?;

    let truth = marker::pose_from_euler((0.3, -0.2, 0.1), (15.0, -10.0, 600.0));
    let noise = GaussianPixelNoise {
        seed: 7,
        sigma_px: 0.3,
    };

    let mut detections = Vec::new();
    for (i, trans) in layout.iter().enumerate() {
        let pose = pose_mul(&truth, trans);
        let px = marker::project_points(&camera, &pose, &marker::square_corners(width))?;
        let mut corners = [Pt2::origin(); 4];
        for (j, p) in px.into_iter().enumerate() {
            corners[j] = noise.apply(i, j, p);
        }
        detections.push(
            MarkerDetection::new(PatternType::Matrix, i as i32, corners).with_confidence(0.9),
        );
    }

    let opts = MultiSolveOptions::default();
    println!("=== Clean detections ===");
    report(&multi_square(&camera, &detections, &mut config, &opts)?, &truth);

    // Drag one corner of marker 4 far off.
    detections[4].corners[2].x += 25.0;
    detections[4].corners[2].y -= 18.0;

    config.reset();
    println!("=== One outlying corner, plain ===");
    report(&multi_square(&camera, &detections, &mut config, &opts)?, &truth);

    config.reset();
    println!("=== One outlying corner, robust ===");
    report(&multi_square_robust(&camera, &detections, &mut config, &opts)?, &truth);

    Ok(())
}

fn report(est: &MultiPoseEstimate, truth: &Mat34) {
    let dt = (est.pose.column(3) - truth.column(3)).norm();
    let dr = rotation_angle_between(&est.pose, truth).to_degrees();
    println!(
        "  markers {:?}, seed {:?}, {} iterations",
        est.visible, est.seed, est.iterations
    );
    println!("  rms {:.3} px, translation error {dt:.3}, rotation error {dr:.4} deg", est.rms());
}

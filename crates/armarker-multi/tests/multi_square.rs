mod common;

use armarker_core::{rotation_angle_between, synthetic::marker, CameraProjection, Mat34};
use armarker_icp::IcpOptions;
use armarker_multi::{
    multi_square, multi_square_robust, MultiError, MultiSolveOptions, Seed,
};
use common::*;

#[test]
fn recovers_composite_pose() {
    let mut config = grid_config(2, 2);
    let gt = ground_truth();
    let dets = detect_all(&config, &camera(), &gt);

    let est = multi_square(&camera(), &dets, &mut config, &MultiSolveOptions::default()).unwrap();

    assert!(translation_error(&est.pose, &gt) < 1e-3);
    assert!(rotation_angle_between(&est.pose, &gt) < 1e-3);
    assert!(est.error < 1e-6);
    assert_eq!(est.visible, vec![0, 1, 2, 3]);
    assert!(config.prev_valid);
    assert_eq!(config.trans, est.pose);
    assert!(config.markers().iter().all(|m| !m.flagged));
}

#[test]
fn partial_visibility_still_solves() {
    let mut config = grid_config(3, 2);
    let gt = ground_truth();
    let dets: Vec<_> = detect_all(&config, &camera(), &gt)
        .into_iter()
        .filter(|d| d.id % 2 == 0)
        .collect();

    let est = multi_square(&camera(), &dets, &mut config, &MultiSolveOptions::default()).unwrap();
    assert_eq!(est.visible, vec![0, 2, 4]);
    assert!(translation_error(&est.pose, &gt) < 1e-3);
}

#[test]
fn robust_beats_plain_with_one_bad_marker() {
    let gt = ground_truth();
    let mut plain_cfg = grid_config(3, 3);
    let mut robust_cfg = grid_config(3, 3);
    let mut dets = detect_all(&plain_cfg, &camera(), &gt);
    add_noise(&mut dets, 0.3, 11);
    shift(&mut dets[4], 40.0, -30.0);

    let opts = MultiSolveOptions::default();
    let plain = multi_square(&camera(), &dets, &mut plain_cfg, &opts).unwrap();
    let robust = multi_square_robust(&camera(), &dets, &mut robust_cfg, &opts).unwrap();

    let plain_t = translation_error(&plain.pose, &gt);
    let robust_t = translation_error(&robust.pose, &gt);
    assert!(robust_t < plain_t, "robust {robust_t} vs plain {plain_t}");

    // The plain estimate is still returned; it just does not seed the next frame.
    assert!(plain.error > opts.pose_error_cutoff_combined);
    assert!(!plain_cfg.prev_valid);
}

#[test]
fn inconsistent_marker_is_flagged_not_dropped() {
    let mut config = grid_config(2, 2);
    let gt = ground_truth();
    let mut dets = detect_all(&config, &camera(), &gt);
    // Distort one corner of marker 1 so its own pose cannot fit.
    dets[1].corners[2].x += 25.0;

    let est = multi_square(&camera(), &dets, &mut config, &MultiSolveOptions::default()).unwrap();

    let flagged: Vec<bool> = config.markers().iter().map(|m| m.flagged).collect();
    assert_eq!(flagged, vec![false, true, false, false]);
    assert!(config.markers()[1].pose_error.unwrap() > 4.0);
    assert_eq!(est.visible.len(), 4);
    assert_ne!(est.seed, Seed::Marker(1));
}

#[test]
fn min_submarker_rejects_sparse_frames() {
    let mut config = grid_config(2, 2);
    config.set_min_submarker(3);
    config.prev_valid = true;
    let gt = ground_truth();
    let dets: Vec<_> = detect_all(&config, &camera(), &gt).into_iter().take(2).collect();

    let err = multi_square(&camera(), &dets, &mut config, &MultiSolveOptions::default()).unwrap_err();

    assert_eq!(
        err,
        MultiError::InsufficientVisibleMarkers {
            visible: 2,
            required: 3
        }
    );
    assert!(!config.prev_valid);
}

#[test]
fn nothing_visible_is_an_error() {
    let mut config = grid_config(2, 2);
    let err = multi_square(&camera(), &[], &mut config, &MultiSolveOptions::default()).unwrap_err();
    assert_eq!(
        err,
        MultiError::InsufficientVisibleMarkers {
            visible: 0,
            required: 1
        }
    );
}

#[test]
fn low_confidence_detections_are_ignored() {
    let mut config = grid_config(2, 2);
    let gt = ground_truth();
    let dets: Vec<_> = detect_all(&config, &camera(), &gt)
        .into_iter()
        .map(|d| d.with_confidence(0.4))
        .collect();
    assert!(multi_square(&camera(), &dets, &mut config, &MultiSolveOptions::default()).is_err());

    config.set_cutoffs(0.3, 0.3);
    assert!(multi_square(&camera(), &dets, &mut config, &MultiSolveOptions::default()).is_ok());
}

#[test]
fn previous_pose_seeds_next_frame() {
    let gt = ground_truth();
    let mut dets = detect_all(&grid_config(3, 3), &camera(), &gt);
    add_noise(&mut dets, 1.0, 5);
    // Evaluate seeds without refinement so the starting point decides.
    let opts = MultiSolveOptions {
        icp: IcpOptions {
            max_loop: 0,
            ..IcpOptions::default()
        },
        ..MultiSolveOptions::default()
    };

    let mut fresh = grid_config(3, 3);
    let from_marker = multi_square(&camera(), &dets, &mut fresh, &opts).unwrap();
    assert!(matches!(from_marker.seed, Seed::Marker(_)));

    let mut tracked = grid_config(3, 3);
    tracked.trans = gt;
    tracked.prev_valid = true;
    let from_prev = multi_square(&camera(), &dets, &mut tracked, &opts).unwrap();

    assert_eq!(from_prev.seed, Seed::Previous);
    assert!(from_prev.error <= from_marker.error);
}

#[test]
fn consecutive_frames_track_motion() {
    let mut config = grid_config(2, 2);
    let opts = MultiSolveOptions::default();
    for k in 0..5 {
        let t = k as f64;
        let gt = marker::pose_from_euler((0.3 + 0.02 * t, -0.2, 0.1 * t), (5.0 * t, 0.0, 850.0));
        let dets = detect_all(&config, &camera(), &gt);
        let est = multi_square(&camera(), &dets, &mut config, &opts).unwrap();
        assert!(translation_error(&est.pose, &gt) < 1e-3, "frame {k}");
        assert!(config.prev_valid);
    }
}

#[test]
fn numerical_failure_keeps_previous_pose() {
    let mut config = grid_config(2, 2);
    let gt = ground_truth();
    let dets = detect_all(&config, &camera(), &gt);
    let previous = marker::pose_from_euler((0.1, 0.0, 0.0), (0.0, 0.0, 700.0));
    config.trans = previous;
    config.prev_valid = true;

    // A degenerate projection: every point lands at infinity.
    let broken = CameraProjection::new(Mat34::zeros());
    let err = multi_square(&broken, &dets, &mut config, &MultiSolveOptions::default()).unwrap_err();

    assert!(matches!(err, MultiError::Linear(_) | MultiError::Icp(_)), "{err}");
    assert_eq!(config.trans, previous);
    assert!(config.prev_valid);
}

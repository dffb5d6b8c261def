//! Association of detections with composite constituents.

use crate::{MarkerDescriptor, MarkerDetection, MultiMarkerConfig};

/// Whether `detection` identifies `marker`, ignoring confidence.
pub fn identifies(marker: &MarkerDescriptor, detection: &MarkerDetection) -> bool {
    if detection.pattern_type != marker.pattern_type {
        return false;
    }
    match (marker.global_id, detection.global_id) {
        (Some(a), Some(b)) => a == b,
        _ => detection.id >= 0 && detection.id == marker.pattern_id,
    }
}

/// Index of the most confident acceptable detection for `marker`.
pub fn best_match(
    config: &MultiMarkerConfig,
    marker: &MarkerDescriptor,
    detections: &[MarkerDetection],
) -> Option<usize> {
    if !config.detection_mode().accepts(marker.pattern_type) {
        return None;
    }
    let cutoff = config.cutoff_for(marker.pattern_type);
    detections
        .iter()
        .enumerate()
        .filter(|(_, d)| identifies(marker, d) && d.confidence >= cutoff)
        .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
            Some((_, c)) if c >= d.confidence => best,
            _ => Some((i, d.confidence)),
        })
        .map(|(i, _)| i)
}

/// Reset per-frame state and record matches for every constituent.
///
/// Returns the number of constituents seen by at least one camera.
pub fn match_detections(
    config: &mut MultiMarkerConfig,
    left: &[MarkerDetection],
    right: Option<&[MarkerDetection]>,
) -> usize {
    let matches: Vec<(Option<usize>, Option<usize>)> = config
        .markers()
        .iter()
        .map(|m| {
            (
                best_match(config, m, left),
                right.and_then(|r| best_match(config, m, r)),
            )
        })
        .collect();

    let mut visible = 0;
    for (m, (l, r)) in config.markers_mut().iter_mut().zip(matches) {
        m.reset_frame_state();
        m.visible = l;
        m.visible_right = r;
        if m.is_visible() {
            visible += 1;
        }
    }
    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DetectionMode, PatternType};
    use armarker_core::{Mat34, Pt2};

    fn corners() -> [Pt2; 4] {
        [
            Pt2::new(0.0, 0.0),
            Pt2::new(1.0, 0.0),
            Pt2::new(1.0, 1.0),
            Pt2::new(0.0, 1.0),
        ]
    }

    fn config() -> MultiMarkerConfig {
        let t = Mat34::identity();
        MultiMarkerConfig::new(vec![
            MarkerDescriptor::new(1, PatternType::Matrix, 10.0, t),
            MarkerDescriptor::new(2, PatternType::Matrix, 10.0, t),
            MarkerDescriptor::new(1, PatternType::Template, 10.0, t),
            MarkerDescriptor::with_global_id(10.0, t, 1 << 33),
        ])
        .unwrap()
    }

    #[test]
    fn highest_confidence_wins() {
        let mut cfg = config();
        let dets = vec![
            MarkerDetection::new(PatternType::Matrix, 1, corners()).with_confidence(0.6),
            MarkerDetection::new(PatternType::Matrix, 1, corners()).with_confidence(0.9),
            MarkerDetection::new(PatternType::Matrix, 1, corners()).with_confidence(0.7),
        ];
        assert_eq!(match_detections(&mut cfg, &dets, None), 1);
        assert_eq!(cfg.markers()[0].visible, Some(1));
    }

    #[test]
    fn confidence_cutoff_applies_per_type() {
        let mut cfg = config();
        cfg.set_cutoffs(0.8, 0.3);
        let dets = vec![
            MarkerDetection::new(PatternType::Matrix, 2, corners()).with_confidence(0.4),
            MarkerDetection::new(PatternType::Template, 1, corners()).with_confidence(0.7),
        ];
        match_detections(&mut cfg, &dets, None);
        assert_eq!(cfg.markers()[1].visible, Some(0));
        assert_eq!(cfg.markers()[2].visible, None);
    }

    #[test]
    fn type_must_match_and_be_enabled() {
        let mut cfg = config();
        let dets = vec![MarkerDetection::new(PatternType::Template, 1, corners())];
        match_detections(&mut cfg, &dets, None);
        assert_eq!(cfg.markers()[0].visible, None);
        assert_eq!(cfg.markers()[2].visible, Some(0));

        cfg.set_detection_mode(DetectionMode::Matrix);
        assert_eq!(match_detections(&mut cfg, &dets, None), 0);
    }

    #[test]
    fn global_ids_are_compared_when_present() {
        let mut cfg = config();
        let dets = vec![
            MarkerDetection::new(PatternType::Matrix, 0, corners()).with_global_id(1 << 34),
            MarkerDetection::new(PatternType::Matrix, 0, corners()).with_global_id(1 << 33),
        ];
        match_detections(&mut cfg, &dets, None);
        assert_eq!(cfg.markers()[3].visible, Some(1));
    }

    #[test]
    fn unidentified_detections_never_match() {
        let mut cfg = config();
        let dets = vec![MarkerDetection::new(PatternType::Matrix, -1, corners())];
        assert_eq!(match_detections(&mut cfg, &dets, None), 0);
    }

    #[test]
    fn stereo_visibility_counts_either_camera() {
        let mut cfg = config();
        let left = vec![MarkerDetection::new(PatternType::Matrix, 1, corners())];
        let right = vec![
            MarkerDetection::new(PatternType::Matrix, 1, corners()),
            MarkerDetection::new(PatternType::Matrix, 2, corners()),
        ];
        assert_eq!(match_detections(&mut cfg, &left, Some(&right)), 2);
        assert_eq!(cfg.markers()[1].visible, None);
        assert_eq!(cfg.markers()[1].visible_right, Some(1));
    }

    #[test]
    fn previous_frame_state_is_cleared() {
        let mut cfg = config();
        let dets = vec![MarkerDetection::new(PatternType::Matrix, 1, corners())];
        match_detections(&mut cfg, &dets, None);
        assert_eq!(match_detections(&mut cfg, &[], None), 0);
        assert!(cfg.visible_markers().is_empty());
    }
}

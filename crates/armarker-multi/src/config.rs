//! Composite marker description and per-frame state.

use std::collections::HashSet;

use armarker_core::{pose_inverse, square_corners, transform_point, Mat3, Mat34, Pt3, Real};
use armarker_linear::{fit_plane, LinearError, PlaneFit};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, DetectionMode, PatternType};

/// Default minimum confidence for template and matrix matches.
pub const DEFAULT_CONFIDENCE_CUTOFF: Real = 0.5;

/// Largest `‖RᵀR − I‖` accepted for a marker's rotation block.
const ROTATION_TOLERANCE: Real = 1e-3;

/// One square marker of a composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerDescriptor {
    pub pattern_id: i32,
    pub pattern_type: PatternType,
    /// Side length, in composite units.
    pub width: Real,
    /// Marker-to-composite transform.
    pub trans: Mat34,
    /// Composite-to-marker transform.
    pub itrans: Mat34,
    /// Corners in composite coordinates, canonical order.
    pub pos3d: [Pt3; 4],
    pub global_id: Option<u64>,
    /// Index of the matched left (or mono) detection this frame.
    #[serde(skip)]
    pub visible: Option<usize>,
    /// Index of the matched right detection this frame.
    #[serde(skip)]
    pub visible_right: Option<usize>,
    /// Mean squared error of this marker's own pose this frame.
    #[serde(skip)]
    pub pose_error: Option<Real>,
    /// Own pose error exceeded the per-marker cutoff this frame.
    #[serde(skip)]
    pub flagged: bool,
}

impl MarkerDescriptor {
    pub fn new(pattern_id: i32, pattern_type: PatternType, width: Real, trans: Mat34) -> Self {
        let pos3d = square_corners(width).map(|c| transform_point(&trans, &c));
        Self {
            pattern_id,
            pattern_type,
            width,
            trans,
            itrans: pose_inverse(&trans),
            pos3d,
            global_id: None,
            visible: None,
            visible_right: None,
            pose_error: None,
            flagged: false,
        }
    }

    /// Matrix marker identified by a 64-bit global id.
    pub fn with_global_id(width: Real, trans: Mat34, global_id: u64) -> Self {
        let mut m = Self::new(0, PatternType::Matrix, width, trans);
        m.global_id = Some(global_id);
        m
    }

    /// Corners in the marker's own frame.
    pub fn local_corners(&self) -> [Pt3; 4] {
        square_corners(self.width)
    }

    /// Seen by at least one camera this frame.
    pub fn is_visible(&self) -> bool {
        self.visible.is_some() || self.visible_right.is_some()
    }

    pub(crate) fn reset_frame_state(&mut self) {
        self.visible = None;
        self.visible_right = None;
        self.pose_error = None;
        self.flagged = false;
    }
}

/// A tracked object made of several square markers with fixed relative
/// poses, plus the state carried between frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiMarkerConfig {
    markers: Vec<MarkerDescriptor>,
    /// Composite-to-camera pose of the last successful solve.
    pub trans: Mat34,
    /// `trans` is usable as a seed for the next frame.
    pub prev_valid: bool,
    detection_mode: DetectionMode,
    cf_pattern_cutoff: Real,
    cf_matrix_cutoff: Real,
    min_submarker: usize,
}

impl MultiMarkerConfig {
    /// Validate `markers` and build a configuration with default cutoffs.
    pub fn new(markers: Vec<MarkerDescriptor>) -> Result<Self, ConfigError> {
        validate(&markers).map_err(|(_, reason)| ConfigError::invalid(None, reason))?;
        Ok(Self::from_validated(markers))
    }

    pub(crate) fn from_validated(markers: Vec<MarkerDescriptor>) -> Self {
        let detection_mode = DetectionMode::covering(markers.iter().map(|m| m.pattern_type))
            .unwrap_or(DetectionMode::TemplateAndMatrix);
        Self {
            markers,
            trans: Mat34::identity(),
            prev_valid: false,
            detection_mode,
            cf_pattern_cutoff: DEFAULT_CONFIDENCE_CUTOFF,
            cf_matrix_cutoff: DEFAULT_CONFIDENCE_CUTOFF,
            min_submarker: 0,
        }
    }

    pub fn markers(&self) -> &[MarkerDescriptor] {
        &self.markers
    }

    pub(crate) fn markers_mut(&mut self) -> &mut [MarkerDescriptor] {
        &mut self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Always false for a validated configuration.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn detection_mode(&self) -> DetectionMode {
        self.detection_mode
    }

    /// Restrict which pattern types are matched.
    pub fn set_detection_mode(&mut self, mode: DetectionMode) {
        self.detection_mode = mode;
    }

    pub fn min_submarker(&self) -> usize {
        self.min_submarker
    }

    /// Minimum visible constituents for a fused pose; `0` means one.
    pub fn set_min_submarker(&mut self, min_submarker: usize) {
        self.min_submarker = min_submarker;
    }

    /// Confidence cutoffs for template and matrix matches.
    pub fn cutoffs(&self) -> (Real, Real) {
        (self.cf_pattern_cutoff, self.cf_matrix_cutoff)
    }

    pub fn set_cutoffs(&mut self, pattern: Real, matrix: Real) {
        self.cf_pattern_cutoff = pattern;
        self.cf_matrix_cutoff = matrix;
    }

    pub fn cutoff_for(&self, pattern_type: PatternType) -> Real {
        match pattern_type {
            PatternType::Template => self.cf_pattern_cutoff,
            PatternType::Matrix => self.cf_matrix_cutoff,
        }
    }

    /// Indices of constituents matched this frame.
    pub fn visible_markers(&self) -> Vec<usize> {
        self.markers
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_visible())
            .map(|(i, _)| i)
            .collect()
    }

    /// Forget the previous pose so the next solve starts from scratch.
    pub fn reset(&mut self) {
        self.prev_valid = false;
        for m in &mut self.markers {
            m.reset_frame_state();
        }
    }

    /// Principal plane through all marker corners.
    pub fn plane_fit(&self) -> Result<PlaneFit, LinearError> {
        let corners: Vec<Pt3> = self.markers.iter().flat_map(|m| m.pos3d).collect();
        fit_plane(&corners)
    }
}

/// Check composite invariants; on failure returns the offending marker
/// index and a reason.
pub(crate) fn validate(markers: &[MarkerDescriptor]) -> Result<(), (usize, String)> {
    if markers.is_empty() {
        return Err((0, "at least one marker is required".to_string()));
    }

    let mut ids = HashSet::new();
    let mut global_ids = HashSet::new();
    for (i, m) in markers.iter().enumerate() {
        if !(m.width.is_finite() && m.width > 0.0) {
            return Err((i, format!("marker {i}: width must be positive, got {}", m.width)));
        }
        let r: Mat3 = m.trans.fixed_view::<3, 3>(0, 0).into_owned();
        let defect = (r.transpose() * r - Mat3::identity()).norm();
        if !(defect < ROTATION_TOLERANCE && r.determinant() > 0.0) {
            return Err((i, format!("marker {i}: transform is not a rigid rotation")));
        }
        match m.global_id {
            Some(g) => {
                if !global_ids.insert(g) {
                    return Err((i, format!("marker {i}: duplicate global id {g}")));
                }
            }
            None => {
                if !ids.insert((m.pattern_type, m.pattern_id)) {
                    return Err((
                        i,
                        format!("marker {i}: duplicate {:?} id {}", m.pattern_type, m.pattern_id),
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use armarker_core::synthetic::marker;
    use approx::assert_relative_eq;

    fn grid_config() -> MultiMarkerConfig {
        let markers = marker::grid_layout(2, 2, 100.0)
            .into_iter()
            .enumerate()
            .map(|(i, t)| MarkerDescriptor::new(i as i32, PatternType::Matrix, 80.0, t))
            .collect();
        MultiMarkerConfig::new(markers).unwrap()
    }

    #[test]
    fn pos3d_follows_transform() {
        let t = marker::pose_from_euler((0.0, 0.0, std::f64::consts::FRAC_PI_2), (10.0, 0.0, 0.0));
        let m = MarkerDescriptor::new(1, PatternType::Template, 2.0, t);
        // (-1, 1, 0) rotated by 90° about Z is (-1, -1, 0), then shifted.
        assert_relative_eq!(m.pos3d[0], Pt3::new(9.0, -1.0, 0.0), epsilon = 1e-12);
        let back = transform_point(&m.itrans, &m.pos3d[0]);
        assert_relative_eq!(back, m.local_corners()[0], epsilon = 1e-12);
    }

    #[test]
    fn defaults() {
        let cfg = grid_config();
        assert_eq!(cfg.len(), 4);
        assert_eq!(cfg.detection_mode(), DetectionMode::Matrix);
        assert_eq!(cfg.cutoffs(), (0.5, 0.5));
        assert_eq!(cfg.min_submarker(), 0);
        assert!(!cfg.prev_valid);
    }

    #[test]
    fn empty_configuration_is_invalid() {
        assert!(matches!(
            MultiMarkerConfig::new(Vec::new()),
            Err(ConfigError::Invalid { line: None, .. })
        ));
    }

    #[test]
    fn rejects_bad_width_and_duplicates() {
        let t = Mat34::identity();
        let bad_width = vec![MarkerDescriptor::new(0, PatternType::Matrix, 0.0, t)];
        assert!(MultiMarkerConfig::new(bad_width).is_err());

        let dup = vec![
            MarkerDescriptor::new(3, PatternType::Matrix, 10.0, t),
            MarkerDescriptor::new(3, PatternType::Matrix, 10.0, t),
        ];
        assert!(MultiMarkerConfig::new(dup).is_err());

        // Same id, different type is fine.
        let mixed = vec![
            MarkerDescriptor::new(3, PatternType::Matrix, 10.0, t),
            MarkerDescriptor::new(3, PatternType::Template, 10.0, t),
        ];
        let cfg = MultiMarkerConfig::new(mixed).unwrap();
        assert_eq!(cfg.detection_mode(), DetectionMode::TemplateAndMatrix);

        let dup_global = vec![
            MarkerDescriptor::with_global_id(10.0, t, 1 << 40),
            MarkerDescriptor::with_global_id(10.0, t, 1 << 40),
        ];
        assert!(MultiMarkerConfig::new(dup_global).is_err());
    }

    #[test]
    fn rejects_non_rigid_transform() {
        let mut t = Mat34::identity();
        t[(0, 0)] = 2.0;
        let markers = vec![MarkerDescriptor::new(0, PatternType::Matrix, 10.0, t)];
        assert!(MultiMarkerConfig::new(markers).is_err());
    }

    #[test]
    fn plane_fit_of_flat_grid() {
        let fit = grid_config().plane_fit().unwrap();
        assert!(fit.planarity < 1e-12);
        assert_relative_eq!(fit.normal.z.abs(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(fit.centroid, Pt3::origin(), epsilon = 1e-9);
    }

    #[test]
    fn setters() {
        let mut cfg = grid_config();
        cfg.set_min_submarker(3);
        cfg.set_cutoffs(0.7, 0.2);
        assert_eq!(cfg.min_submarker(), 3);
        assert_eq!(cfg.cutoff_for(PatternType::Template), 0.7);
        assert_eq!(cfg.cutoff_for(PatternType::Matrix), 0.2);
    }
}

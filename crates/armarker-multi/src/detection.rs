//! Marker detections as delivered by the square-marker detector.

use armarker_core::{quad_area, Pt2, Real};
use serde::{Deserialize, Serialize};

/// How a square marker's interior is identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Template-matched picture pattern.
    Template,
    /// Encoded 2D barcode.
    Matrix,
}

/// Which pattern types the detector is trusted to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    Template,
    Matrix,
    TemplateAndMatrix,
}

impl DetectionMode {
    pub fn accepts(self, pattern_type: PatternType) -> bool {
        matches!(
            (self, pattern_type),
            (DetectionMode::TemplateAndMatrix, _)
                | (DetectionMode::Template, PatternType::Template)
                | (DetectionMode::Matrix, PatternType::Matrix)
        )
    }

    /// Mode covering exactly the given pattern types.
    pub fn covering(types: impl IntoIterator<Item = PatternType>) -> Option<Self> {
        let (mut template, mut matrix) = (false, false);
        for t in types {
            match t {
                PatternType::Template => template = true,
                PatternType::Matrix => matrix = true,
            }
        }
        match (template, matrix) {
            (true, true) => Some(DetectionMode::TemplateAndMatrix),
            (true, false) => Some(DetectionMode::Template),
            (false, true) => Some(DetectionMode::Matrix),
            (false, false) => None,
        }
    }
}

/// One detected square in an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub pattern_type: PatternType,
    /// Pattern index or matrix code; negative when unidentified.
    pub id: i32,
    pub confidence: Real,
    /// Clockwise rotation (0..4) of the detected corner list relative to
    /// the marker's canonical corner order.
    pub direction: usize,
    /// Detected corners in image order.
    pub corners: [Pt2; 4],
    /// Area in pixels² of the detected quadrilateral.
    pub area: Real,
    #[serde(default)]
    pub global_id: Option<u64>,
}

impl MarkerDetection {
    /// Fully confident detection with corners already in canonical order.
    pub fn new(pattern_type: PatternType, id: i32, corners: [Pt2; 4]) -> Self {
        Self {
            pattern_type,
            id,
            confidence: 1.0,
            direction: 0,
            area: quad_area(&corners),
            corners,
            global_id: None,
        }
    }

    pub fn with_confidence(mut self, confidence: Real) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_global_id(mut self, global_id: u64) -> Self {
        self.global_id = Some(global_id);
        self
    }

    /// Re-express canonical corners as a detector would report them for a
    /// marker seen with the given rotation.
    pub fn rotated(mut self, direction: usize) -> Self {
        let canonical = self.ordered_corners();
        let direction = direction % 4;
        for (j, c) in canonical.iter().enumerate() {
            self.corners[(4 - direction + j) % 4] = *c;
        }
        self.direction = direction;
        self
    }

    /// Corners in the marker's canonical order: corner `j` is detected
    /// corner `(4 − direction + j) mod 4`.
    pub fn ordered_corners(&self) -> [Pt2; 4] {
        let dir = self.direction % 4;
        std::array::from_fn(|j| self.corners[(4 - dir + j) % 4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> [Pt2; 4] {
        [
            Pt2::new(0.0, 0.0),
            Pt2::new(10.0, 0.0),
            Pt2::new(10.0, 10.0),
            Pt2::new(0.0, 10.0),
        ]
    }

    #[test]
    fn rotation_round_trips_through_ordered_corners() {
        for dir in 0..4 {
            let d = MarkerDetection::new(PatternType::Matrix, 3, square()).rotated(dir);
            assert_eq!(d.direction, dir);
            assert_eq!(d.ordered_corners(), square());
        }
    }

    #[test]
    fn direction_one_shifts_corner_list() {
        let d = MarkerDetection::new(PatternType::Template, 0, square()).rotated(1);
        assert_eq!(d.corners[3], square()[0]);
        assert_eq!(d.corners[0], square()[1]);
    }

    #[test]
    fn area_is_computed() {
        let d = MarkerDetection::new(PatternType::Template, 0, square());
        assert_eq!(d.area, 100.0);
    }

    #[test]
    fn detection_mode_coverage() {
        assert_eq!(
            DetectionMode::covering([PatternType::Template, PatternType::Matrix]),
            Some(DetectionMode::TemplateAndMatrix)
        );
        assert_eq!(DetectionMode::covering([]), None);
        assert!(DetectionMode::Matrix.accepts(PatternType::Matrix));
        assert!(!DetectionMode::Matrix.accepts(PatternType::Template));
        assert!(DetectionMode::TemplateAndMatrix.accepts(PatternType::Template));
    }
}

//! Tracker capability set and the square-marker tracker.

use armarker_core::{CameraProjection, Real, StereoCameras};
use armarker_multi::{
    matching::best_match, multi_square, multi_square_robust, multi_square_stereo,
    multi_square_stereo_robust, square_pose, square_pose_cont, DetectionMode, MarkerDetection,
    MultiMarkerConfig, MultiSolveOptions, DEFAULT_CONFIDENCE_CUTOFF,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::trackable::{MultiSquareTrackable, SquareTrackable, Trackable};
use crate::TrackError;

/// Settings applied to every trackable on each update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub solve: MultiSolveOptions,
    /// Minimum confidence for template matches.
    pub pattern_cutoff: Real,
    /// Minimum confidence for matrix code matches.
    pub matrix_cutoff: Real,
    /// Overrides the detection mode derived from each composite's markers.
    pub detection_mode: Option<DetectionMode>,
    /// Minimum number of visible constituents for a composite pose.
    pub min_submarker: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            solve: MultiSolveOptions::default(),
            pattern_cutoff: DEFAULT_CONFIDENCE_CUTOFF,
            matrix_cutoff: DEFAULT_CONFIDENCE_CUTOFF,
            detection_mode: None,
            min_submarker: 0,
        }
    }
}

impl TrackerConfig {
    fn validate(&self) -> Result<(), TrackError> {
        for (name, v) in [
            ("pattern_cutoff", self.pattern_cutoff),
            ("matrix_cutoff", self.matrix_cutoff),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(TrackError::InvalidConfig(format!(
                    "{name} must lie in [0, 1], got {v}"
                )));
            }
        }
        if !(self.solve.pose_error_cutoff_combined > 0.0) {
            return Err(TrackError::InvalidConfig(
                "pose_error_cutoff_combined must be positive".into(),
            ));
        }
        Ok(())
    }

    fn apply(&self, config: &mut MultiMarkerConfig) {
        config.set_cutoffs(self.pattern_cutoff, self.matrix_cutoff);
        if let Some(mode) = self.detection_mode {
            config.set_detection_mode(mode);
        }
    }
}

/// Calibration the tracker runs against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerCameras {
    Mono(CameraProjection),
    Stereo(StereoCameras),
}

impl TrackerCameras {
    pub fn left(&self) -> &CameraProjection {
        match self {
            TrackerCameras::Mono(c) => c,
            TrackerCameras::Stereo(s) => &s.left,
        }
    }
}

/// Detector output for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub index: u64,
    pub left: Vec<MarkerDetection>,
    /// Right-camera detections; ignored by a mono tracker.
    #[serde(default)]
    pub right: Option<Vec<MarkerDetection>>,
}

impl Frame {
    pub fn mono(index: u64, detections: Vec<MarkerDetection>) -> Self {
        Self {
            index,
            left: detections,
            right: None,
        }
    }

    pub fn stereo(index: u64, left: Vec<MarkerDetection>, right: Vec<MarkerDetection>) -> Self {
        Self {
            index,
            left,
            right: Some(right),
        }
    }
}

/// Lifecycle shared by every tracker: `init`, then `start` with a
/// calibration, then `update` once per frame until `stop`.
pub trait Tracker {
    fn init(&mut self) -> Result<(), TrackError>;
    fn start(&mut self, cameras: TrackerCameras) -> Result<(), TrackError>;
    /// Update the pose state of `trackables` from one frame of detections.
    fn update(&mut self, frame: &Frame, trackables: &mut [Trackable]) -> Result<(), TrackError>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// Tracker for square markers and multi-marker composites.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareTracker {
    config: TrackerConfig,
    initialised: bool,
    cameras: Option<TrackerCameras>,
}

impl SquareTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            initialised: false,
            cameras: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn cameras(&self) -> Option<&TrackerCameras> {
        self.cameras.as_ref()
    }

    fn update_square(&self, cameras: &TrackerCameras, frame: &Frame, t: &mut SquareTrackable) {
        self.config.apply(&mut t.config);
        if !t.use_cont_pose_estimation {
            t.config.prev_valid = false;
        }

        let solved = match cameras {
            TrackerCameras::Mono(camera) => {
                let marker = &t.config.markers()[0];
                match best_match(&t.config, marker, &frame.left) {
                    None => None,
                    Some(i) => {
                        let det = &frame.left[i];
                        let icp = &self.config.solve.icp;
                        let result = if t.config.prev_valid {
                            square_pose_cont(camera, det, marker.width, &t.config.trans, icp)
                        } else {
                            square_pose(camera, det, marker.width, icp)
                        };
                        match result {
                            Ok(report) => {
                                t.config.trans = report.pose;
                                t.config.prev_valid = true;
                                Some((report.pose, report.error))
                            }
                            Err(e) => {
                                debug!("square {}: {e}", t.status.uid());
                                None
                            }
                        }
                    }
                }
            }
            // The composite solver records the seed state for the next frame.
            TrackerCameras::Stereo(cams) => {
                let right = frame.right.as_deref().unwrap_or(&[]);
                match multi_square_stereo(cams, &frame.left, right, &mut t.config, &self.config.solve) {
                    Ok(est) => Some((est.pose, est.error)),
                    Err(e) => {
                        debug!("square {}: {e}", t.status.uid());
                        None
                    }
                }
            }
        };

        match solved {
            Some((pose, error)) => t.status.found(pose, error),
            None => {
                t.config.prev_valid = false;
                t.status.lost();
            }
        }
    }

    fn update_multi(&self, cameras: &TrackerCameras, frame: &Frame, t: &mut MultiSquareTrackable) {
        self.config.apply(&mut t.config);
        t.config.set_min_submarker(self.config.min_submarker);

        let opts = &self.config.solve;
        let result = match (cameras, t.robust) {
            (TrackerCameras::Mono(c), false) => multi_square(c, &frame.left, &mut t.config, opts),
            (TrackerCameras::Mono(c), true) => {
                multi_square_robust(c, &frame.left, &mut t.config, opts)
            }
            (TrackerCameras::Stereo(s), robust) => {
                let right = frame.right.as_deref().unwrap_or(&[]);
                if robust {
                    multi_square_stereo_robust(s, &frame.left, right, &mut t.config, opts)
                } else {
                    multi_square_stereo(s, &frame.left, right, &mut t.config, opts)
                }
            }
        };

        match result {
            Ok(est) if est.error < opts.pose_error_cutoff_combined => {
                t.status.found(est.pose, est.error)
            }
            Ok(est) => {
                debug!(
                    "composite {}: fused error {:.3} above cutoff",
                    t.status.uid(),
                    est.error
                );
                t.status.lost();
            }
            Err(e) => {
                debug!("composite {}: {e}", t.status.uid());
                t.status.lost();
            }
        }
    }
}

impl Tracker for SquareTracker {
    fn init(&mut self) -> Result<(), TrackError> {
        self.config.validate()?;
        self.initialised = true;
        Ok(())
    }

    fn start(&mut self, cameras: TrackerCameras) -> Result<(), TrackError> {
        if !self.initialised {
            return Err(TrackError::NotInitialised);
        }
        if self.cameras.is_some() {
            return Err(TrackError::AlreadyRunning);
        }
        info!(
            "square tracker started ({})",
            match cameras {
                TrackerCameras::Mono(_) => "mono",
                TrackerCameras::Stereo(_) => "stereo",
            }
        );
        self.cameras = Some(cameras);
        Ok(())
    }

    fn update(&mut self, frame: &Frame, trackables: &mut [Trackable]) -> Result<(), TrackError> {
        let cameras = self.cameras.ok_or(TrackError::NotRunning)?;
        for trackable in trackables.iter_mut() {
            match trackable {
                Trackable::Square(t) => self.update_square(&cameras, frame, t),
                Trackable::MultiSquare(t) => self.update_multi(&cameras, frame, t),
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.cameras.take().is_some() {
            info!("square tracker stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.cameras.is_some()
    }
}

/// Every available tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyTracker {
    Square(SquareTracker),
}

impl AnyTracker {
    /// Tracker selected by name; only `"square"` is available.
    pub fn with_config(kind: &str, config: TrackerConfig) -> Result<Self, TrackError> {
        match kind {
            "square" => Ok(AnyTracker::Square(SquareTracker::new(config))),
            other => Err(TrackError::InvalidConfig(format!("unknown tracker '{other}'"))),
        }
    }
}

impl Tracker for AnyTracker {
    fn init(&mut self) -> Result<(), TrackError> {
        match self {
            AnyTracker::Square(t) => t.init(),
        }
    }

    fn start(&mut self, cameras: TrackerCameras) -> Result<(), TrackError> {
        match self {
            AnyTracker::Square(t) => t.start(cameras),
        }
    }

    fn update(&mut self, frame: &Frame, trackables: &mut [Trackable]) -> Result<(), TrackError> {
        match self {
            AnyTracker::Square(t) => t.update(frame, trackables),
        }
    }

    fn stop(&mut self) {
        match self {
            AnyTracker::Square(t) => t.stop(),
        }
    }

    fn is_running(&self) -> bool {
        match self {
            AnyTracker::Square(t) => t.is_running(),
        }
    }
}

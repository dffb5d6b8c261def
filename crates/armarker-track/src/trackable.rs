//! Trackable objects and their per-frame pose state.
//!
//! A trackable is either one square marker or a multi-marker composite.
//! Trackables are created from short description strings:
//!
//! | description | trackable |
//! |---|---|
//! | `single;<pattern name>;<width>` | template square |
//! | `single_barcode;<id>;<width>` | matrix code square |
//! | `multi;<config path>` | composite loaded from a configuration file |

use std::sync::atomic::{AtomicU32, Ordering};

use armarker_core::{Mat34, Real, StereoCameras};
use armarker_multi::{
    MarkerDescriptor, MultiMarkerConfig, PatternResolver, PatternType,
};
use serde::{Deserialize, Serialize};

use crate::filter::{FilterConfig, PoseFilter};
use crate::gl::camera_view_rh;
use crate::TrackError;

static NEXT_UID: AtomicU32 = AtomicU32::new(0);

fn next_uid() -> u32 {
    NEXT_UID.fetch_add(1, Ordering::Relaxed)
}

/// Pose state shared by every trackable kind.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingStatus {
    uid: u32,
    visible: bool,
    pose: Mat34,
    error: Real,
    filter: Option<PoseFilter>,
}

impl TrackingStatus {
    fn new() -> Self {
        Self {
            uid: next_uid(),
            visible: false,
            pose: Mat34::identity(),
            error: 0.0,
            filter: None,
        }
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Last reported pose, filtered when a filter is enabled.
    pub fn pose(&self) -> Option<&Mat34> {
        self.visible.then_some(&self.pose)
    }

    pub fn error(&self) -> Real {
        self.error
    }

    pub(crate) fn found(&mut self, pose: Mat34, error: Real) {
        self.pose = match self.filter.as_mut() {
            Some(filter) => filter.apply(&pose),
            None => pose,
        };
        self.error = error;
        self.visible = true;
    }

    pub(crate) fn lost(&mut self) {
        self.visible = false;
        if let Some(filter) = self.filter.as_mut() {
            filter.reset();
        }
    }
}

/// A single square marker.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareTrackable {
    pub(crate) status: TrackingStatus,
    /// One-marker composite at the origin; carries the previous-pose state.
    pub(crate) config: MultiMarkerConfig,
    /// Seed each frame from the previous pose while the marker stays visible.
    pub use_cont_pose_estimation: bool,
}

impl SquareTrackable {
    pub fn new(pattern_type: PatternType, pattern_id: i32, width: Real) -> Result<Self, TrackError> {
        let marker = MarkerDescriptor::new(pattern_id, pattern_type, width, Mat34::identity());
        Self::from_marker(marker)
    }

    /// Matrix code square identified by a 64-bit global id.
    pub fn with_global_id(global_id: u64, width: Real) -> Result<Self, TrackError> {
        Self::from_marker(MarkerDescriptor::with_global_id(width, Mat34::identity(), global_id))
    }

    fn from_marker(marker: MarkerDescriptor) -> Result<Self, TrackError> {
        Ok(Self {
            status: TrackingStatus::new(),
            config: MultiMarkerConfig::new(vec![marker])?,
            use_cont_pose_estimation: true,
        })
    }

    pub fn marker(&self) -> &MarkerDescriptor {
        &self.config.markers()[0]
    }

    pub fn width(&self) -> Real {
        self.marker().width
    }
}

/// A multi-marker composite.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiSquareTrackable {
    pub(crate) status: TrackingStatus,
    pub(crate) config: MultiMarkerConfig,
    /// Use the Tukey-weighted fused solve.
    pub robust: bool,
}

impl MultiSquareTrackable {
    pub fn new(config: MultiMarkerConfig) -> Self {
        Self {
            status: TrackingStatus::new(),
            config,
            robust: true,
        }
    }

    pub fn config(&self) -> &MultiMarkerConfig {
        &self.config
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trackable {
    Square(SquareTrackable),
    MultiSquare(MultiSquareTrackable),
}

/// Per-frame report for one trackable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackableSnapshot {
    pub uid: u32,
    pub visible: bool,
    pub pose: Option<Mat34>,
    pub error: Real,
}

impl Trackable {
    /// Build a trackable from its description string.
    pub fn parse(desc: &str, resolver: &mut dyn PatternResolver) -> Result<Self, TrackError> {
        let invalid = |reason: &str| TrackError::InvalidDescriptor {
            desc: desc.to_string(),
            reason: reason.to_string(),
        };
        let fields: Vec<&str> = desc.split(';').map(str::trim).collect();
        let width = |s: &str| -> Result<Real, TrackError> {
            s.parse::<Real>()
                .ok()
                .filter(|w| w.is_finite() && *w > 0.0)
                .ok_or_else(|| invalid("width must be a positive number"))
        };

        match fields.as_slice() {
            ["single", name, w] => {
                let width = width(w)?;
                let id = resolver
                    .resolve(name)
                    .ok_or_else(|| invalid("unknown pattern"))?;
                Ok(Trackable::Square(SquareTrackable::new(PatternType::Template, id, width)?))
            }
            ["single_barcode", id, w] => {
                let width = width(w)?;
                let code: u64 = id.parse().map_err(|_| invalid("barcode id must be an integer"))?;
                let square = match i32::try_from(code) {
                    Ok(id) => SquareTrackable::new(PatternType::Matrix, id, width)?,
                    Err(_) => SquareTrackable::with_global_id(code, width)?,
                };
                Ok(Trackable::Square(square))
            }
            ["multi", path] => {
                let config = MultiMarkerConfig::from_file(path, resolver)?;
                Ok(Trackable::MultiSquare(MultiSquareTrackable::new(config)))
            }
            [kind, ..] if matches!(*kind, "single" | "single_barcode" | "multi") => {
                Err(invalid("wrong number of fields"))
            }
            _ => Err(invalid("unknown trackable type")),
        }
    }

    pub fn status(&self) -> &TrackingStatus {
        match self {
            Trackable::Square(t) => &t.status,
            Trackable::MultiSquare(t) => &t.status,
        }
    }

    fn status_mut(&mut self) -> &mut TrackingStatus {
        match self {
            Trackable::Square(t) => &mut t.status,
            Trackable::MultiSquare(t) => &mut t.status,
        }
    }

    pub fn uid(&self) -> u32 {
        self.status().uid()
    }

    pub fn is_visible(&self) -> bool {
        self.status().is_visible()
    }

    pub fn pose(&self) -> Option<&Mat34> {
        self.status().pose()
    }

    /// Enable pose filtering, or disable it with `None`.
    pub fn set_filter(&mut self, config: Option<FilterConfig>) {
        self.status_mut().filter = config.map(PoseFilter::new);
    }

    pub fn is_filtered(&self) -> bool {
        self.status().filter.is_some()
    }

    /// OpenGL model-view matrix for the left (or only) camera.
    pub fn gl_model_view(&self, scale: Real) -> Option<[Real; 16]> {
        self.pose().map(|p| camera_view_rh(p, scale))
    }

    /// OpenGL model-view matrix for the right camera of a stereo rig.
    pub fn gl_model_view_right(&self, cameras: &StereoCameras, scale: Real) -> Option<[Real; 16]> {
        self.pose()
            .map(|p| camera_view_rh(&cameras.right_pose(p), scale))
    }

    pub fn snapshot(&self) -> TrackableSnapshot {
        let status = self.status();
        TrackableSnapshot {
            uid: status.uid(),
            visible: status.is_visible(),
            pose: status.pose().copied(),
            error: status.error(),
        }
    }
}

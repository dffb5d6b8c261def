//! Tracking front end for square markers and multi-marker composites.
//!
//! - [`Trackable`]: a single square or a composite, with its per-frame pose
//!   state, optional [`PoseFilter`] and OpenGL model-view matrix.
//! - [`Tracker`]: `init` / `start` / `update` / `stop` lifecycle;
//!   [`SquareTracker`] is the only implementation, reached through
//!   [`AnyTracker`].
//! - [`TrackingWorker`]: runs a started tracker on its own thread.
//!
//! ```no_run
//! use armarker_core::{CameraProjection, FxFyCxCySkew};
//! use armarker_multi::PatternIdTable;
//! use armarker_track::{AnyTracker, Frame, Trackable, Tracker, TrackerCameras, TrackerConfig};
//!
//! let camera = CameraProjection::from_intrinsics(&FxFyCxCySkew {
//!     fx: 800.0, fy: 800.0, cx: 320.0, cy: 240.0, skew: 0.0,
//! });
//! let mut patterns = PatternIdTable::new();
//! let mut trackables = vec![
//!     Trackable::parse("single_barcode;0;80", &mut patterns)?,
//!     Trackable::parse("multi;board.dat", &mut patterns)?,
//! ];
//! let mut tracker = AnyTracker::with_config("square", TrackerConfig::default())?;
//! tracker.init()?;
//! tracker.start(TrackerCameras::Mono(camera))?;
//! tracker.update(&Frame::mono(0, Vec::new()), &mut trackables)?;
//! for t in &trackables {
//!     if let Some(m) = t.gl_model_view(1.0) {
//!         println!("{}: {:?}", t.uid(), m);
//!     }
//! }
//! # Ok::<(), armarker_track::TrackError>(())
//! ```

mod error;
pub mod filter;
pub mod gl;
mod trackable;
mod tracker;
mod worker;

pub use error::TrackError;
pub use filter::{FilterConfig, PoseFilter};
pub use trackable::*;
pub use tracker::*;
pub use worker::{FrameResult, TrackingWorker};

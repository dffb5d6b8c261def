//! Multi-marker composites: configuration model and fused pose solvers.
//!
//! A [`MultiMarkerConfig`] describes a tracked object made of several
//! square markers with fixed relative transforms. Per frame, the solvers
//! match [`MarkerDetection`]s to its constituents and estimate one
//! composite-to-camera pose:
//!
//! | | plain | robust |
//! |---|---|---|
//! | mono | [`multi_square`] | [`multi_square_robust`] |
//! | stereo | [`multi_square_stereo`] | [`multi_square_stereo_robust`] |
//!
//! Single squares are handled by [`square_pose`] / [`square_pose_cont`].
//!
//! # Example
//!
//! ```no_run
//! use armarker_core::{CameraProjection, FxFyCxCySkew};
//! use armarker_multi::{multi_square, MultiMarkerConfig, MultiSolveOptions, PatternIdTable};
//!
//! let camera = CameraProjection::from_intrinsics(&FxFyCxCySkew {
//!     fx: 800.0, fy: 800.0, cx: 320.0, cy: 240.0, skew: 0.0,
//! });
//! let mut config = MultiMarkerConfig::from_file("board.dat", &mut PatternIdTable::new())?;
//! let detections: Vec<armarker_multi::MarkerDetection> = Vec::new(); // from the detector
//! match multi_square(&camera, &detections, &mut config, &MultiSolveOptions::default()) {
//!     Ok(est) => println!("pose error {:.3}", est.error),
//!     Err(e) => println!("no pose this frame: {e}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod detection;
mod error;
pub mod matching;
mod parse;
mod solver;
mod square;

pub use config::*;
pub use detection::*;
pub use error::*;
pub use parse::{PatternIdTable, PatternResolver};
pub use solver::*;
pub use square::*;

use armarker_core::MatError;
use thiserror::Error;

/// Failures of the iterative pose solvers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IcpError {
    #[error("need at least {needed} correspondences, got {got}")]
    TooFewPoints { needed: usize, got: usize },
    #[error("point projects on or behind the camera plane")]
    BehindCamera,
    #[error("normal equations: {0}")]
    Mat(#[from] MatError),
}

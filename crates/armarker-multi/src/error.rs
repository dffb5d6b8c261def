use std::path::PathBuf;

use armarker_icp::IcpError;
use armarker_linear::LinearError;
use thiserror::Error;

/// Failures of a fused multi-marker solve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MultiError {
    #[error("{visible} constituent markers visible, {required} required")]
    InsufficientVisibleMarkers { visible: usize, required: usize },
    #[error("pose refinement: {0}")]
    Icp(#[from] IcpError),
    #[error("pose initialisation: {0}")]
    Linear(#[from] LinearError),
}

/// Failures while loading or validating a multi-marker configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("invalid multi-marker configuration{}: {reason}", at_line(.line))]
    Invalid { line: Option<usize>, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(line: Option<usize>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            line,
            reason: reason.into(),
        }
    }
}

fn at_line(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

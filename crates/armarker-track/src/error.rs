use armarker_multi::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("invalid trackable description '{desc}': {reason}")]
    InvalidDescriptor { desc: String, reason: String },
    #[error("invalid tracker configuration: {0}")]
    InvalidConfig(String),
    #[error("tracker has not been initialised")]
    NotInitialised,
    #[error("tracker is not running")]
    NotRunning,
    #[error("tracker is already running")]
    AlreadyRunning,
    #[error("tracking worker has stopped")]
    WorkerStopped,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

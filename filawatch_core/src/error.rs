use thiserror::Error;

/// Build-time validation failures; fatal before the monitor activates.
#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing position source")]
    MissingPositionSource,
    #[error("missing presence sink")]
    MissingPresenceSink,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Runtime configuration rejections, e.g. an operator override that fails
/// the positivity check at the boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("detection length must be a positive number of millimeters, got {0}")]
    DetectionLength(f64),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

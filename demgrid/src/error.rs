use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid grid header {path}: {reason}")]
    Header { path: PathBuf, reason: String },

    #[error("expected {expected} samples, found {found}")]
    SampleCount { expected: usize, found: usize },

    #[error("invalid sample value '{0}'")]
    Sample(String),

    #[error("unsupported grid format {0}")]
    Format(PathBuf),

    #[error("grid must have at least one row and column and a positive cell size")]
    Dimensions,
}

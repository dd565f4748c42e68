use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Geodetic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeodeticPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Cell address inside a file's time x channel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObservationKey {
    pub time_index: usize,
    pub channel_index: usize,
}

impl ObservationKey {
    pub fn new(time_index: usize, channel_index: usize) -> Self {
        Self {
            time_index,
            channel_index,
        }
    }
}

/// Common error type for the core.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
    #[error("fill value: {0}")]
    FillValue(String),
    #[error("malformed source {}: {reason}", path.display())]
    MalformedSource { path: PathBuf, reason: String },
}

impl CoreError {
    pub fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        CoreError::MalformedSource {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn is_malformed_source(&self) -> bool {
        matches!(self, CoreError::MalformedSource { .. })
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

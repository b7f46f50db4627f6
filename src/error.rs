use std::path::PathBuf;

use thiserror::Error;
use wavers::WaversError;

#[derive(Debug, Error)]
pub enum SliceError {
    #[error("file '{}' does not exist", .0.display())]
    InputNotFound(PathBuf),

    #[error("{flag} argument must be between 0 and 20000 (got {value})")]
    InvalidFilterParameter { flag: &'static str, value: i64 },

    #[error("--max-slices must be greater than 0 (got {0})")]
    InvalidSliceLimit(i64),

    #[error("--every must be at least 0.001 seconds (got {0})")]
    InvalidInterval(f64),

    #[error("unsupported audio format: '{0}'")]
    UnsupportedFormat(String),

    #[error("invalid audio stream: {0}")]
    InvalidAudio(String),

    #[error("could not decode audio: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("wav codec error: {0}")]
    Wav(#[from] WaversError),

    #[error("loudness measurement failed: {0}")]
    Loudness(#[from] ebur128::Error),

    #[error("could not serialize report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

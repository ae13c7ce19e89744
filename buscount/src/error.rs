//! Error types for the counting pipeline

use linetrack::{ConfigError, TrackError};
use thiserror::Error;

/// Result type alias for the counting pipeline
pub type Result<T> = std::result::Result<T, CounterError>;

/// Opaque failure reported by a detector
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Detector '{detector}' failed: {message}")]
pub struct DetectorError {
    pub detector: String,
    pub message: String,
}

impl DetectorError {
    pub fn new<N: Into<String>, S: Into<String>>(detector: N, message: S) -> Self {
        Self {
            detector: detector.into(),
            message: message.into(),
        }
    }
}

/// Errors that abort a counting run
#[derive(Error, Debug)]
pub enum CounterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("World configuration error: {0}")]
    World(#[from] ConfigError),

    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error("Tracking error: {0}")]
    Track(#[from] TrackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Pipeline stage '{0}' panicked")]
    StagePanicked(String),

    #[error("Pipeline stage disconnected: {0}")]
    Disconnected(String),
}

impl CounterError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn disconnected<S: Into<String>>(msg: S) -> Self {
        Self::Disconnected(msg.into())
    }
}

//! Error types for the line crossing tracker

use thiserror::Error;

/// Result type alias for the tracker
pub type Result<T> = std::result::Result<T, TrackError>;

/// Errors raised while loading a [`WorldConfig`](crate::WorldConfig)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read world config: {0}")]
    Io(#[from] std::io::Error),

    #[error("File does not contain a crossing line")]
    MissingCrossing,

    #[error("Malformed world config at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

impl ConfigError {
    pub fn malformed<S: Into<String>>(line: usize, reason: S) -> Self {
        Self::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while associating detections with tracks
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Association invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Modality '{name}' failed: {message}")]
    Modality { name: String, message: String },
}

impl TrackError {
    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn modality<N: Into<String>, S: Into<String>>(name: N, msg: S) -> Self {
        Self::Modality {
            name: name.into(),
            message: msg.into(),
        }
    }
}

//! Error types for a video analysis run.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Coarse failure category, for callers that branch on the kind of failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Processing,
    Output,
    Model,
}

/// Every error aborts the run; there is no partial result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to open input video {}: {message}", .path.display())]
    Input { path: PathBuf, message: String },

    #[error("Exception during processing of {} at frame {frame}: {message}", .input.display())]
    Processing {
        input: PathBuf,
        frame: u64,
        message: String,
    },

    #[error("Failed to write output video {}: {message}", .path.display())]
    Output { path: PathBuf, message: String },

    #[error("Failed to load pose model {}: {message}", .path.display())]
    Model { path: PathBuf, message: String },
}

impl AnalysisError {
    pub fn input(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Input {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Frame stages don't know which file they are reading; the frame loop
    /// fills in the input with [`AnalysisError::with_input`].
    pub fn processing(frame: u64, message: impl Into<String>) -> Self {
        Self::Processing {
            input: PathBuf::new(),
            frame,
            message: message.into(),
        }
    }

    /// Names the input video on a processing error. Other kinds already
    /// carry their own path and pass through untouched.
    pub fn with_input(self, path: impl AsRef<Path>) -> Self {
        match self {
            Self::Processing { frame, message, .. } => Self::Processing {
                input: path.as_ref().to_path_buf(),
                frame,
                message,
            },
            other => other,
        }
    }

    pub fn output(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Output {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Model errors carry the whole `anyhow` chain so the root cause survives.
    pub fn model(path: impl AsRef<Path>, err: &anyhow::Error) -> Self {
        Self::Model {
            path: path.as_ref().to_path_buf(),
            message: format!("{err:#}"),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Input { .. } => ErrorKind::Input,
            AnalysisError::Processing { .. } => ErrorKind::Processing,
            AnalysisError::Output { .. } => ErrorKind::Output,
            AnalysisError::Model { .. } => ErrorKind::Model,
        }
    }

    pub fn to_record(&self) -> ErrorRecord {
        ErrorRecord {
            error: self.to_string(),
        }
    }
}

/// The single-field record emitted instead of a report on failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub error: String,
}

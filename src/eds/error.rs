use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while turning a grid file into an EDS map
#[derive(Debug, Error)]
pub enum EdsMapError {
    /// File could not be opened or is not a rectangular delimited table
    #[error("Ingest error ({path}): {message}")]
    Ingest { path: PathBuf, message: String },

    /// Grid has no cells, or no cell holds a number
    #[error("Invalid grid ({path}): {reason}")]
    InvalidGrid { path: PathBuf, reason: String },

    /// Input base name is empty
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Unknown colour map, unusable output directory, or encoding failure
    #[error("Render error: {0}")]
    Render(String),

    /// Batch started with no input files
    #[error("No input files selected")]
    NothingSelected,

    /// Output directory missing from the batch request or not creatable
    #[error("Output directory error ({path}): {message}")]
    OutputDir { path: PathBuf, message: String },
}

impl EdsMapError {
    pub(crate) fn ingest(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        EdsMapError::Ingest {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid_grid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EdsMapError::InvalidGrid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Type alias for Results using EdsMapError
pub type Result<T> = std::result::Result<T, EdsMapError>;

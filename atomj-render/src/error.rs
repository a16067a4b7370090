//! Error types for atomj-render.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Rendering and configuration errors.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Error from the core model.
    #[error(transparent)]
    Core(#[from] atomj_core::Error),

    /// Gradient bounds that are not finite or not ordered.
    #[error("invalid gradient bounds: [{lower}, {upper}]")]
    InvalidBounds {
        /// Requested lower bound.
        lower: f64,
        /// Requested upper bound.
        upper: f64,
    },

    /// Gradient without color stops.
    #[error("color gradient needs at least one stop")]
    EmptyGradient,

    /// No dataset layer at this index.
    #[error("no dataset at index {0}")]
    UnknownDataset(usize),

    /// Style store I/O failure.
    #[error("style store I/O error at {path}: {source}")]
    StoreIo {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Style could not be (de)serialized.
    #[error("style serialization error: {0}")]
    StoreFormat(#[from] serde_json::Error),
}

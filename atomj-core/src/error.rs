//! Error types for atomj-core.

use thiserror::Error;

/// Result type alias for atomj operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for atomj operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Grid with zero rows or columns.
    #[error("grid must have at least one row and one column")]
    EmptyGrid,

    /// Flat sample buffer does not match the requested dimensions.
    #[error("expected {expected} samples, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Grid spacing must be positive and finite.
    #[error("invalid grid increment: {0}")]
    InvalidIncrement(f64),

    /// Lower bound above upper bound, or a non-finite bound.
    #[error("invalid range: [{lower}, {upper}]")]
    InvalidRange { lower: f64, upper: f64 },

    /// Shape cannot be built from the given points.
    #[error("degenerate shape: {0}")]
    DegenerateShape(String),

    /// No ROI with this key in the collection.
    #[error("no ROI with key {0}")]
    UnknownRoi(usize),
}

//! Error types for atomj-roi.

use thiserror::Error;

/// Result type alias for ROI commands.
pub type Result<T> = std::result::Result<T, RoiError>;

/// ROI command errors.
#[derive(Error, Debug)]
pub enum RoiError {
    /// Error from the core model.
    #[error(transparent)]
    Core(#[from] atomj_core::Error),

    /// No command with this id.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The command exists but its precondition does not hold.
    #[error("command '{0}' is not enabled")]
    CommandDisabled(&'static str),
}

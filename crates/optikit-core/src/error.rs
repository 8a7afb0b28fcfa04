//! Error handling for the OptiKit sequence model.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Sequence model error type
///
/// Represents errors raised when indexing or editing the ordered
/// interface/gap sequence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    /// Surface index outside the current interface list
    #[error("Surface index {index} out of range (model has {count} surfaces)")]
    SurfaceOutOfRange {
        /// The requested surface index.
        index: usize,
        /// The number of surfaces in the model.
        count: usize,
    },

    /// Gap index outside the current gap list
    #[error("Gap index {index} out of range (model has {count} gaps)")]
    GapOutOfRange {
        /// The requested gap index.
        index: usize,
        /// The number of gaps in the model.
        count: usize,
    },
}

/// Result type using SequenceError
pub type Result<T> = std::result::Result<T, SequenceError>;

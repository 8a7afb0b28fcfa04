//! Error handling for the assembly layer.
//!
//! Lookup misses on the part tree are `Option` returns, not errors; the
//! variants here cover reference resolution failures, malformed tree
//! files, and the one grouping configuration that is rejected outright.

use optikit_core::SequenceError;
use thiserror::Error;

/// Assembly error type
///
/// Represents errors raised while grouping a sequence into parts or while
/// synchronizing the part tree with the sequence model.
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// A node name referred to an element label the catalog does not know
    #[error("Unknown element label '{label}'")]
    UnknownLabel {
        /// The label that could not be resolved.
        label: String,
    },

    /// A profile/reference-interface name appeared outside an element node
    #[error("Node '{name}' has no enclosing element to resolve against")]
    OrphanName {
        /// The name of the orphaned node.
        name: String,
    },

    /// A node's referent no longer exists in the sequence model
    #[error("Referent of node '{name}' is no longer in the sequence model")]
    DanglingReferent {
        /// The name of the stale node.
        name: String,
    },

    /// More than one reflecting interface inside a single non-air run
    #[error("Second buried reflector at surface {index}; at most one reflector per non-air run is supported")]
    MultipleBuriedReflectors {
        /// Index of the offending surface.
        index: usize,
    },

    /// A serialized tree file failed structural validation
    #[error("Malformed tree file: {reason}")]
    MalformedTreeFile {
        /// What the validation found.
        reason: String,
    },

    /// Sequence model error
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

/// Result type using AssemblyError
pub type Result<T> = std::result::Result<T, AssemblyError>;

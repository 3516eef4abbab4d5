//! Error types for replica construction.

use thiserror::Error;

/// Configuration errors raised when wiring a replica group together.
///
/// The merge/GC path itself has no recoverable errors; once a replica is
/// constructed, every operation is total over well-formed states.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplicaError {
    #[error("replica index {index} out of range for {count} replicas")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("a replica group needs at least one member")]
    EmptyGroup,
}

pub type Result<T> = std::result::Result<T, ReplicaError>;

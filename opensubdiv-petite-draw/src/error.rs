//! Error types for the opensubdiv-petite-draw crate.

use thiserror::Error;

/// Main error type for draw context construction.
///
/// Every variant is terminal for the build that produced it. The caller may
/// start a fresh build later but nothing allocated by the failed one is
/// reused.
#[derive(Debug, Error)]
pub enum Error {
    /// A buffer or view was rejected by the resource provider.
    #[error("Failed to allocate {label}: {reason}")]
    AllocationFailed { label: &'static str, reason: String },

    /// A writable region of a buffer could not be obtained.
    #[error("Failed to map {label} for writing: {reason}")]
    MapFailed { label: &'static str, reason: String },

    /// Index out of bounds.
    #[error("Index {index} out of bounds (max: {max})")]
    IndexOutOfBounds { index: usize, max: usize },

    /// Invalid buffer size.
    #[error("Invalid buffer size: expected {expected}, got {actual}")]
    InvalidBufferSize { expected: usize, actual: usize },

    /// Invalid patch configuration.
    #[error("Invalid patch configuration: {0}")]
    InvalidPatch(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` for failures reported by a resource provider, as
    /// opposed to failures caused by inconsistent input tables.
    pub fn is_resource_failure(&self) -> bool {
        matches!(self, Error::AllocationFailed { .. } | Error::MapFailed { .. })
    }
}

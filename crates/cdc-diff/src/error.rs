//! Error types for the diff crate.

/// Errors that can occur while comparing two images.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiffError {
    /// The images nest deeper than the engine is willing to follow.
    #[error("nesting deeper than {limit} levels at `{path}`")]
    DepthExceeded { path: String, limit: usize },

    /// An array could not be serialized for comparison.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;

use std::io;

/// Errors produced when submitting entries to an event bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bus refused the entry.
    #[error("entry rejected: {0}")]
    Rejected(String),

    /// The bus could not be reached or has shut down.
    #[error("bus unavailable: {0}")]
    Unavailable(String),

    /// The bus is shedding load.
    #[error("bus throttled the request")]
    Throttled,

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error while writing to a sink.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the bus crate.
pub type BusResult<T> = std::result::Result<T, BusError>;

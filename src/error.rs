//! Error types and handling for chunkflow
//!
//! Every `ChunkStream` carries its failure in-band: a stream that fails yields
//! exactly one `Err(StreamError)` and then ends.

/// Main error type for chunkflow operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    /// I/O related errors
    #[error("IO error: {0}")]
    IO(String),
    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,
    /// A bounded buffer would have grown past its configured limit
    #[error("Resource exhausted")]
    ResourceExhausted,
    /// Operation was cancelled
    #[error("Operation cancelled")]
    Cancelled,
    /// A stage or source was constructed with an argument it cannot honor
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The iterable behind a source adapter failed mid-iteration
    #[error("Source failed: {0}")]
    Source(String),
    /// Custom error with message
    #[error("Stream error: {0}")]
    Custom(String),
}

impl StreamError {
    /// Shorthand for [`StreamError::Custom`], mostly used by stage callbacks.
    pub fn custom(msg: impl Into<String>) -> Self {
        StreamError::Custom(msg.into())
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        StreamError::InvalidArgument(msg.into())
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::IO(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for StreamError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        StreamError::Timeout
    }
}

/// Result type for chunkflow operations
pub type StreamResult<T> = Result<T, StreamError>;

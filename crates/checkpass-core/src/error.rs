//! Error types for the checkpass core library

use thiserror::Error;

/// Result type alias for conversation operations
pub type Result<T> = std::result::Result<T, ConvError>;

/// Failures on the framed control channel.
///
/// Every variant is fatal to the process: a setuid helper with a broken
/// control channel has no safe way to continue, so the driver maps all of
/// these to the reserved communication exit code.
#[derive(Debug, Error)]
pub enum WireError {
    /// The stream ended, or a non-blocking peer had nothing more to offer,
    /// in the middle of a frame.
    #[error("truncated transfer on control channel: wanted {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    /// The peer announced a frame larger than the receiver is willing to
    /// allocate.
    #[error("peer announced a {len}-byte frame, ceiling is {limit}")]
    OversizedLength { len: i32, limit: usize },

    /// I/O error from the underlying descriptor.
    #[error("control channel I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced through the conversation abstraction
#[derive(Debug, Error)]
pub enum ConvError {
    /// Control channel failure
    #[error("control channel failure: {0}")]
    Wire(#[from] WireError),

    /// The `-S` descriptor did not survive the startup probe
    #[error("server descriptor {0} is not usable")]
    BadDescriptor(i32),

    /// A binary prompt was shorter than its own embedded length
    #[error("binary prompt shorter than its embedded length")]
    MalformedBinaryPrompt,
}

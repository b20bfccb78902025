//! Error types for Recon containers
//!
//! Every failure is a local, synchronous contract violation raised to the
//! immediate caller. There is no retry or recovery layer.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for Recon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Meld and Wall containers
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying storage medium
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Leading identifier does not match the expected container format
    #[error("Format error: {0}")]
    Format(String),

    /// Corrupt or truncated header, block or journal record
    #[error("Malformed data: {0}")]
    MalformedData(String),

    /// A table, object, signal or alias name is already taken
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// No table or object with this name exists
    #[error("Unknown name: {0}")]
    UnknownName(String),

    /// The table has no signal (or alias) with this name
    #[error("Unknown signal '{signal}' in table '{table}'")]
    UnknownSignal {
        /// Table that was searched
        table: String,
        /// Name that was requested
        signal: String,
    },

    /// A transform descriptor could not be parsed
    #[error("Invalid transform: {0}")]
    InvalidTransform(String),

    /// Structure is frozen once the container is finalized
    #[error("Container is already finalized")]
    AlreadyFinalized,

    /// Data writes require a finalized container
    #[error("Container must be finalized before writing data")]
    NotFinalized,

    /// Signals and objects are written exactly once
    #[error("Already written: {0}")]
    AlreadyWritten(String),

    /// The writer was closed
    #[error("Container is closed for writing")]
    AlreadyClosed,

    /// Close found declared signals or objects without data
    #[error("Data not written for: {}", .0.join(", "))]
    MissingData(Vec<String>),

    /// Wrong number of values, missing/extra keys, or a scalar where a sequence is required
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Element type does not match the declared or required type
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Required type
        expected: String,
        /// Type that was supplied
        actual: String,
    },

    /// Call arguments are contradictory
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A header rewrite would exceed the space reserved at finalize
    #[error("Header grew on rewrite: {actual} bytes exceeds reserved {ceiling}")]
    HeaderOverflow {
        /// Header length recorded at finalize
        ceiling: usize,
        /// Length of the rewritten header
        actual: usize,
    },

    /// An encoded block or journal record exceeds the readable maximum
    #[error("Encoded block of {actual} bytes exceeds limit of {limit}")]
    BlockTooLarge {
        /// Largest block the container accepts
        limit: usize,
        /// Encoded length of the rejected block
        actual: usize,
    },

    /// Serializer failed to encode a value
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid writer or reader configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a type mismatch error
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an unknown signal error
    pub fn unknown_signal(table: impl Into<String>, signal: impl Into<String>) -> Self {
        Error::UnknownSignal {
            table: table.into(),
            signal: signal.into(),
        }
    }

    /// Create a malformed data error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedData(msg.into())
    }
}

//! Error types for the fgui runtime.

use thiserror::Error;

/// Main error type for package decoding and runtime operations.
///
/// The type is `Clone` so that a failed lazy decode can be memoized and
/// handed to every later caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Package does not start with the `FGUI` magic bytes
    #[error("Invalid package: expected FGUI signature")]
    InvalidSignature,

    /// Package body is compressed
    #[error("Compressed packages are not supported")]
    CompressedUnsupported,

    /// Buffer is truncated or a record points past its end
    #[error("Unexpected end of data at position {pos} (needed {needed} bytes, buffer length {len})")]
    Truncated { pos: usize, needed: usize, len: usize },

    /// Invalid data structure in a record
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    /// Item not found by id, name or url
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Package not found in the registry
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    /// Item exists but is not a component
    #[error("Item {0} is not a component")]
    NotAComponent(String),

    /// Index outside a valid range (controller page, child index)
    #[error("Index {index} out of range (count: {count})")]
    IndexOutOfRange { index: i32, count: usize },

    /// A binding references a controller or object that does not exist
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    /// I/O error while reading a package file
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create an unresolved reference error.
    pub fn unresolved(msg: impl Into<String>) -> Self {
        Self::UnresolvedReference(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Result type alias for fgui operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Shared error type for the workspace.

use thiserror::Error;

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Workspace-wide error type.
///
/// Kept as a single flat enum rather than one error type per crate so that
/// callers composing several Graphos components don't have to thread
/// conversions between them.
#[derive(Error, Debug)]
pub enum Error {
    /// An I/O failure while reading or writing a file owned by a Graphos
    /// component (spill files, write-ahead logs, etc.).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value was invalid or a required runtime facility
    /// (e.g. a memory-notification service) was unavailable at construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// An internal invariant was violated, typically a programmer error such
    /// as calling an operation after the component has been closed.
    #[error("internal error: {0}")]
    Internal(String),

    /// A value could not be serialized or deserialized into its on-disk
    /// representation.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Builds a [`Error::Config`] from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Builds a [`Error::Internal`] from any displayable message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

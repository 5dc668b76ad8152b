//! Error types for dots-core

use std::path::PathBuf;

/// Result type for dots-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dots-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No provider section in the configuration
    #[error("No storage backend configured; add a [provider] section to the config file")]
    NoBackend,

    /// A path that is not part of the tracked file set
    #[error("Not a tracked file: {path}")]
    NotTracked { path: PathBuf },

    /// Profile name that matches no built-in profile
    #[error("Unknown sync profile: {name}")]
    UnknownProfile { name: String },

    /// Filesystem subscription failure
    #[error("Watcher error: {message}")]
    Watcher { message: String },

    /// Persisted state could not be read or written
    #[error("State error: {message}")]
    State { message: String },

    /// Secret store rejected an operation
    #[error("Secret store error: {message}")]
    Secrets { message: String },

    // Transparent wrappers for underlying crate errors
    /// Storage error from dots-storage
    #[error(transparent)]
    Storage(#[from] dots_storage::Error),

    /// Catalog error from dots-catalog
    #[error(transparent)]
    Catalog(#[from] dots_catalog::Error),

    /// Metadata error from dots-meta
    #[error(transparent)]
    Meta(#[from] dots_meta::Error),

    /// Filesystem error from dots-fs
    #[error(transparent)]
    Fs(#[from] dots_fs::Error),
}

impl From<notify::Error> for Error {
    fn from(e: notify::Error) -> Self {
        Error::Watcher {
            message: e.to_string(),
        }
    }
}

impl Error {
    /// Configuration and authentication failures that should stop a whole command.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::NoBackend => true,
            Error::Storage(e) => e.is_fatal(),
            _ => false,
        }
    }
}

//! Error types for dots-meta

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] dots_fs::Error),

    #[error("Unknown provider kind: {kind}")]
    InvalidProvider { kind: String },

    #[error("Unknown conflict resolution: {value} (expected local, remote, merge, or skip)")]
    InvalidResolution { value: String },

    #[error("Unknown category: {value}")]
    InvalidCategory { value: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Could not determine the home directory")]
    HomeNotFound,
}

//! Error taxonomy shared by every storage backend

use std::path::PathBuf;

use dots_meta::ProviderKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{provider} backend is not configured: missing {missing}")]
    NotConfigured {
        provider: ProviderKind,
        missing: String,
    },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Remote file not found: {key}")]
    FileNotFound { key: String },

    #[error("Upload of {key} failed: {message}")]
    UploadFailed { key: String, message: String },

    #[error("Download of {key} failed: {message}")]
    DownloadFailed { key: String, message: String },

    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    #[error("{path} appears to contain credentials and will not be transferred")]
    ContainsCredentials { path: PathBuf },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error(transparent)]
    Fs(#[from] dots_fs::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(what: impl Into<String>, message: impl ToString) -> Self {
        Error::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::FileNotFound { .. })
    }

    /// Configuration and authentication problems. Retrying other files
    /// cannot succeed, so a transfer batch stops at the first one.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::NotConfigured { .. }
                | Error::AuthenticationFailed { .. }
                | Error::InvalidCredentials { .. }
        )
    }
}

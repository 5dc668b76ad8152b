//! Storage backend abstraction
//!
//! One trait covers every provider. The set of variants is closed: a new
//! provider means a new [`ProviderKind`] and a new arm in [`create_backend`].

use std::time::Duration;

use async_trait::async_trait;
use dots_meta::{ProviderConfig, ProviderKind, RemoteObject, TrackedFile};

use crate::azure::{AzureBackend, AzureCredentials};
use crate::gcs::{GcsBackend, GcsCredentials};
use crate::local::LocalStoreBackend;
use crate::s3::{S3Backend, S3Credentials};
use crate::Result;

/// Uniform contract over remote object stores.
///
/// Operations that take a [`TrackedFile`] refuse unsafe files with
/// [`Error::ContainsCredentials`](crate::Error::ContainsCredentials) before
/// touching the network or the disk.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether every credential and setting the backend needs is present.
    fn is_configured(&self) -> bool;

    /// Whether [`list_files`](Self::list_files) reports content checksums.
    ///
    /// When false, conflict detection degrades to timestamps only.
    fn reports_checksums(&self) -> bool;

    /// Root folder prefixed to every key.
    fn root_folder(&self) -> &str;

    async fn upload(&self, file: &TrackedFile, bytes: &[u8]) -> Result<()>;

    async fn download(&self, file: &TrackedFile) -> Result<Vec<u8>>;

    /// Every object under the config prefix.
    async fn list_files(&self) -> Result<Vec<RemoteObject>>;

    /// Delete the file's object. Deleting a missing object succeeds.
    async fn delete(&self, file: &TrackedFile) -> Result<()>;

    /// Metadata for the file's object, or `None` when it does not exist.
    async fn get_metadata(&self, file: &TrackedFile) -> Result<Option<RemoteObject>>;

    /// Probe connectivity and credentials. Failures are logged, not returned.
    async fn test_connection(&self) -> bool;
}

/// Secrets needed by a backend, fetched from the secret store by name.
#[derive(Clone, Default)]
pub enum Credentials {
    S3(S3Credentials),
    Azure(AzureCredentials),
    Gcs(GcsCredentials),
    /// System identity token for the local store, if signed in.
    LocalStore { identity_token: Option<String> },
    #[default]
    None,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            Credentials::S3(_) => "S3",
            Credentials::Azure(_) => "Azure",
            Credentials::Gcs(_) => "Gcs",
            Credentials::LocalStore { .. } => "LocalStore",
            Credentials::None => "None",
        };
        write!(f, "Credentials::{variant}(..)")
    }
}

/// Build the backend for `config.kind`.
///
/// Credentials of the wrong variant are ignored and the backend reports
/// itself unconfigured.
pub fn create_backend(
    config: &ProviderConfig,
    credentials: Credentials,
    timeout: Duration,
) -> Result<Box<dyn StorageBackend>> {
    tracing::debug!(provider = %config.kind, bucket = %config.bucket, "Creating storage backend");
    let backend: Box<dyn StorageBackend> = match config.kind {
        ProviderKind::S3 | ProviderKind::S3Compatible => {
            let creds = match credentials {
                Credentials::S3(c) => Some(c),
                _ => None,
            };
            Box::new(S3Backend::new(config, creds, timeout)?)
        }
        ProviderKind::Azure => {
            let creds = match credentials {
                Credentials::Azure(c) => Some(c),
                _ => None,
            };
            Box::new(AzureBackend::new(config, creds, timeout)?)
        }
        ProviderKind::Gcs => {
            let creds = match credentials {
                Credentials::Gcs(c) => Some(c),
                _ => None,
            };
            Box::new(GcsBackend::new(config, creds, timeout)?)
        }
        ProviderKind::LocalStore => {
            let token = match credentials {
                Credentials::LocalStore { identity_token } => identity_token,
                _ => None,
            };
            Box::new(LocalStoreBackend::new(config, token))
        }
    };
    Ok(backend)
}

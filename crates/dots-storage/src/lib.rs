//! Storage backends for dotsync
//!
//! Every backend implements [`StorageBackend`] and stores files under the
//! same key layout, `{root}/configs/{category}/{filename}`, so a remote
//! written by one variant reads the same through another.
//!
//! Variants:
//! - [`S3Backend`]: S3 and S3-compatible services, SigV4-signed requests
//! - [`AzureBackend`]: Azure Blob Storage with client-credentials OAuth2
//! - [`GcsBackend`]: Google Cloud Storage with a service-account JWT grant
//! - [`LocalStoreBackend`]: a locally synced container directory
//!
//! [`create_backend`] selects the variant for a [`ProviderKind`](dots_meta::ProviderKind).

pub mod azure;
pub mod backend;
pub mod error;
pub mod gcs;
mod http;
pub mod keys;
pub mod local;
pub mod s3;
pub mod signer;
mod xml;

pub use azure::{AzureBackend, AzureCredentials};
pub use backend::{Credentials, StorageBackend, create_backend};
pub use error::{Error, Result};
pub use gcs::{GcsBackend, GcsCredentials};
pub use keys::{config_prefix, ensure_transferable, remote_key};
pub use local::LocalStoreBackend;
pub use s3::{S3Backend, S3Credentials};
pub use signer::RequestSigner;

use dots_meta::ProviderKind;
use dots_storage::{AzureCredentials, Credentials, GcsCredentials, S3Credentials};

use super::SecretStore;

/// Names under which backend credentials live in a [`SecretStore`].
pub mod secret_names {
    pub const AWS_ACCESS_KEY_ID: &str = "aws-access-key-id";
    pub const AWS_SECRET_ACCESS_KEY: &str = "aws-secret-access-key";
    pub const AZURE_TENANT_ID: &str = "azure-tenant-id";
    pub const AZURE_CLIENT_ID: &str = "azure-client-id";
    pub const AZURE_CLIENT_SECRET: &str = "azure-client-secret";
    pub const GCP_PROJECT_ID: &str = "gcp-project-id";
    pub const GCP_SERVICE_ACCOUNT_KEY: &str = "gcp-service-account-key";
    pub const UBIQUITY_IDENTITY: &str = "ubiquity-identity";
}

/// Assemble backend credentials for `kind` from named secrets.
///
/// Missing secrets yield [`Credentials::None`]; the backend then reports
/// itself unconfigured instead of failing here.
pub fn credentials_from_secrets(kind: ProviderKind, store: &dyn SecretStore) -> Credentials {
    use secret_names::*;

    match kind {
        ProviderKind::S3 | ProviderKind::S3Compatible => {
            match (store.get(AWS_ACCESS_KEY_ID), store.get(AWS_SECRET_ACCESS_KEY)) {
                (Some(access), Some(secret)) => Credentials::S3(S3Credentials::new(access, secret)),
                _ => Credentials::None,
            }
        }
        ProviderKind::Azure => match (
            store.get(AZURE_TENANT_ID),
            store.get(AZURE_CLIENT_ID),
            store.get(AZURE_CLIENT_SECRET),
        ) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                Credentials::Azure(AzureCredentials {
                    tenant_id,
                    client_id,
                    client_secret,
                })
            }
            _ => Credentials::None,
        },
        ProviderKind::Gcs => match store.get(GCP_SERVICE_ACCOUNT_KEY) {
            Some(service_account_key) => Credentials::Gcs(GcsCredentials {
                project_id: store.get(GCP_PROJECT_ID),
                service_account_key,
            }),
            None => Credentials::None,
        },
        ProviderKind::LocalStore => Credentials::LocalStore {
            identity_token: store.get(UBIQUITY_IDENTITY),
        },
    }
}

//! Google Cloud Storage
//!
//! Service-account authentication: a JWT assertion signed with the account's
//! RSA key (RS256) is exchanged for a bearer token, then the JSON API is used
//! for object operations.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dots_fs::compute_bytes_checksum;
use dots_meta::{ProviderConfig, ProviderKind, RemoteObject, TrackedFile};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::http::{self, describe_failure, is_auth_failure};
use crate::keys::{config_prefix, ensure_transferable, remote_key};
use crate::signer::uri_encode;
use crate::{Error, Result};

const DEFAULT_API_BASE: &str = "https://storage.googleapis.com";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Clone)]
pub struct GcsCredentials {
    pub project_id: Option<String>,
    /// Service-account key file contents (JSON).
    pub service_account_key: String,
}

/// The fields of a service-account key file this backend needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ServiceAccountKey {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidCredentials {
            message: format!("malformed service account key: {e}"),
        })
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

/// Claims of the OAuth2 JWT-bearer assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign the RS256 assertion for `key`, issued at `issued_at`.
pub fn build_assertion(key: &ServiceAccountKey, issued_at: DateTime<Utc>) -> Result<String> {
    let iat = issued_at.timestamp();
    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: STORAGE_SCOPE.to_string(),
        aud: key.token_uri().to_string(),
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key =
        EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| Error::InvalidCredentials {
            message: format!("unusable service account private key: {e}"),
        })?;
    jsonwebtoken::encode(&header, &claims, &encoding_key).map_err(|e| Error::InvalidCredentials {
        message: format!("failed to sign assertion: {e}"),
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ObjectResource {
    name: String,
    #[serde(default)]
    size: Option<String>,
    updated: DateTime<Utc>,
    #[serde(default)]
    metadata: Option<std::collections::HashMap<String, String>>,
}

impl ObjectResource {
    fn into_remote(self) -> RemoteObject {
        let mut metadata = self.metadata.unwrap_or_default();
        RemoteObject {
            size: self.size.and_then(|s| s.parse().ok()).unwrap_or(0),
            modified: http::source_mtime(
                metadata.get(http::MTIME_META).map(String::as_str),
                self.updated,
            ),
            checksum: metadata.remove("sha256"),
            key: self.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectResource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

pub struct GcsBackend {
    client: Client,
    bucket: String,
    root_folder: String,
    api_base: String,
    project_id: Option<String>,
    key: Option<ServiceAccountKey>,
    key_error: Option<String>,
}

impl GcsBackend {
    pub fn new(
        config: &ProviderConfig,
        credentials: Option<GcsCredentials>,
        timeout: Duration,
    ) -> Result<Self> {
        let (key, key_error, project_id) = match credentials {
            Some(creds) => match ServiceAccountKey::parse(&creds.service_account_key) {
                Ok(key) => {
                    let project = creds.project_id.or_else(|| key.project_id.clone());
                    (Some(key), None, project)
                }
                Err(e) => (None, Some(e.to_string()), creds.project_id),
            },
            None => (None, None, None),
        };
        Ok(Self {
            client: http::build_client(timeout)?,
            bucket: config.bucket.clone(),
            root_folder: config.root_folder.clone(),
            api_base: config
                .endpoint
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            project_id,
            key,
            key_error,
        })
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    fn service_account(&self) -> Result<&ServiceAccountKey> {
        if self.bucket.is_empty() {
            return Err(Error::NotConfigured {
                provider: ProviderKind::Gcs,
                missing: "bucket".into(),
            });
        }
        if let Some(message) = &self.key_error {
            return Err(Error::InvalidCredentials {
                message: message.clone(),
            });
        }
        self.key.as_ref().ok_or_else(|| Error::NotConfigured {
            provider: ProviderKind::Gcs,
            missing: "service account key".into(),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let key = self.service_account()?;
        let assertion = build_assertion(key, Utc::now())?;
        let response = self
            .client
            .post(key.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::AuthenticationFailed {
                message: describe_failure(response).await,
            });
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::parse("GCS token response", e))?;
        tracing::debug!(account = %key.client_email, "Acquired GCS access token");
        Ok(token.access_token)
    }

    fn object_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.api_base,
            uri_encode(&self.bucket, true),
            uri_encode(name, true)
        )
    }

    fn objects_url(&self) -> String {
        format!("{}/storage/v1/b/{}/o", self.api_base, uri_encode(&self.bucket, true))
    }

    async fn authorized(&self, method: Method, url: String) -> Result<RequestBuilder> {
        let token = self.access_token().await?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }
}

/// `multipart/related` body carrying object metadata and content.
fn multipart_body(boundary: &str, metadata: &serde_json::Value, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/octet-stream\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[async_trait]
impl StorageBackend for GcsBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gcs
    }

    fn is_configured(&self) -> bool {
        self.service_account().is_ok()
    }

    fn reports_checksums(&self) -> bool {
        true
    }

    fn root_folder(&self) -> &str {
        &self.root_folder
    }

    async fn upload(&self, file: &TrackedFile, bytes: &[u8]) -> Result<()> {
        ensure_transferable(file)?;
        let key = remote_key(&self.root_folder, file);
        let metadata = serde_json::json!({
            "name": key,
            "metadata": {
                "sha256": compute_bytes_checksum(bytes),
                (http::MTIME_META): http::format_mtime(file.modified),
            },
        });
        let boundary = format!("dotsync-{}", Uuid::new_v4().simple());
        let url = format!(
            "{}/upload/storage/v1/b/{}/o",
            self.api_base,
            uri_encode(&self.bucket, true)
        );

        let response = self
            .authorized(Method::POST, url)
            .await?
            .query(&[("uploadType", "multipart")])
            .header(
                "content-type",
                format!("multipart/related; boundary={boundary}"),
            )
            .body(multipart_body(&boundary, &metadata, bytes))
            .send()
            .await?;
        let status = response.status();
        if is_auth_failure(status) {
            return Err(Error::AuthenticationFailed {
                message: describe_failure(response).await,
            });
        }
        if !status.is_success() {
            return Err(Error::UploadFailed {
                key,
                message: describe_failure(response).await,
            });
        }
        tracing::info!(key = %key, bytes = bytes.len(), "Uploaded to GCS");
        Ok(())
    }

    async fn download(&self, file: &TrackedFile) -> Result<Vec<u8>> {
        ensure_transferable(file)?;
        let key = remote_key(&self.root_folder, file);
        let response = self
            .authorized(Method::GET, self.object_url(&key))
            .await?
            .query(&[("alt", "media")])
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::FileNotFound { key }),
            status if is_auth_failure(status) => Err(Error::AuthenticationFailed {
                message: describe_failure(response).await,
            }),
            status if !status.is_success() => Err(Error::DownloadFailed {
                key,
                message: describe_failure(response).await,
            }),
            _ => Ok(response.bytes().await?.to_vec()),
        }
    }

    async fn list_files(&self) -> Result<Vec<RemoteObject>> {
        let prefix = config_prefix(&self.root_folder);
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("prefix", prefix.clone())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }
            let response = self
                .authorized(Method::GET, self.objects_url())
                .await?
                .query(&query)
                .send()
                .await?;
            let status = response.status();
            if is_auth_failure(status) {
                return Err(Error::AuthenticationFailed {
                    message: describe_failure(response).await,
                });
            }
            if !status.is_success() {
                return Err(Error::parse("GCS object listing", describe_failure(response).await));
            }
            let page: ObjectList = response
                .json()
                .await
                .map_err(|e| Error::parse("GCS object listing", e))?;
            objects.extend(page.items.into_iter().map(ObjectResource::into_remote));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        tracing::debug!(count = objects.len(), "Listed GCS objects");
        Ok(objects)
    }

    async fn delete(&self, file: &TrackedFile) -> Result<()> {
        ensure_transferable(file)?;
        let key = remote_key(&self.root_folder, file);
        let response = self
            .authorized(Method::DELETE, self.object_url(&key))
            .await?
            .send()
            .await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        if is_auth_failure(status) {
            return Err(Error::AuthenticationFailed {
                message: describe_failure(response).await,
            });
        }
        Err(Error::UploadFailed {
            key,
            message: format!("delete rejected: {}", describe_failure(response).await),
        })
    }

    async fn get_metadata(&self, file: &TrackedFile) -> Result<Option<RemoteObject>> {
        ensure_transferable(file)?;
        let key = remote_key(&self.root_folder, file);
        let response = self
            .authorized(Method::GET, self.object_url(&key))
            .await?
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => Err(Error::DownloadFailed {
                key,
                message: describe_failure(response).await,
            }),
            _ => {
                let object: ObjectResource = response
                    .json()
                    .await
                    .map_err(|e| Error::parse("GCS object resource", e))?;
                Ok(Some(object.into_remote()))
            }
        }
    }

    async fn test_connection(&self) -> bool {
        let url = format!("{}/storage/v1/b/{}", self.api_base, uri_encode(&self.bucket, true));
        let request = match self.authorized(Method::GET, url).await {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "GCS connection test failed");
                return false;
            }
        };
        match request.send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "GCS connection test rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "GCS connection test failed");
                false
            }
        }
    }
}

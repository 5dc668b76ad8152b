//! Azure Blob Storage
//!
//! Each public operation acquires a fresh bearer token through the OAuth2
//! client-credentials grant. Tokens are not cached across calls.

use std::time::Duration;

use async_trait::async_trait;
use dots_fs::compute_bytes_checksum;
use dots_meta::{ProviderConfig, ProviderKind, RemoteObject, TrackedFile};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;

use crate::backend::StorageBackend;
use crate::http::{self, describe_failure, header_str, header_u64, is_auth_failure};
use crate::keys::{config_prefix, ensure_transferable, remote_key};
use crate::signer::uri_encode;
use crate::{Error, Result, xml};

pub const API_VERSION: &str = "2021-08-06";
const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";
const CHECKSUM_HEADER: &str = "x-ms-meta-sha256";
const MTIME_HEADER: &str = "x-ms-meta-mtime";

#[derive(Clone)]
pub struct AzureCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl AzureCredentials {
    fn missing(&self) -> Option<&'static str> {
        if self.tenant_id.is_empty() {
            Some("tenant id")
        } else if self.client_id.is_empty() {
            Some("client id")
        } else if self.client_secret.is_empty() {
            Some("client secret")
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct AzureBackend {
    client: Client,
    container: String,
    root_folder: String,
    /// Blob service endpoint, e.g. `https://account.blob.core.windows.net`.
    blob_endpoint: Option<String>,
    authority: String,
    credentials: Option<AzureCredentials>,
}

impl AzureBackend {
    pub fn new(
        config: &ProviderConfig,
        credentials: Option<AzureCredentials>,
        timeout: Duration,
    ) -> Result<Self> {
        let blob_endpoint = match (&config.endpoint, &config.account) {
            (Some(endpoint), _) => Some(endpoint.trim_end_matches('/').to_string()),
            (None, Some(account)) => Some(format!("https://{account}.blob.core.windows.net")),
            (None, None) => None,
        };
        Ok(Self {
            client: http::build_client(timeout)?,
            container: config.bucket.clone(),
            root_folder: config.root_folder.clone(),
            blob_endpoint,
            authority: DEFAULT_AUTHORITY.to_string(),
            credentials,
        })
    }

    /// Point token requests at a different authority host.
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into().trim_end_matches('/').to_string();
        self
    }

    fn not_configured(missing: &str) -> Error {
        Error::NotConfigured {
            provider: ProviderKind::Azure,
            missing: missing.to_string(),
        }
    }

    fn check_configured(&self) -> Result<(&AzureCredentials, &str)> {
        let endpoint = self
            .blob_endpoint
            .as_deref()
            .ok_or_else(|| Self::not_configured("storage account"))?;
        if self.container.is_empty() {
            return Err(Self::not_configured("container"));
        }
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| Self::not_configured("service principal credentials"))?;
        if let Some(missing) = credentials.missing() {
            return Err(Self::not_configured(missing));
        }
        Ok((credentials, endpoint))
    }

    /// Client-credentials grant against the tenant token endpoint.
    async fn access_token(&self, credentials: &AzureCredentials) -> Result<String> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority, credentials.tenant_id
        );
        let response = self
            .client
            .post(url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("scope", STORAGE_SCOPE),
            ])
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
            .map_err(|e| Error::parse("Azure token response", e))?;
        tracing::debug!("Acquired Azure access token");
        Ok(token.access_token)
    }

    /// Authenticated request builder for a blob or container URL.
    async fn request(&self, method: Method, key: Option<&str>) -> Result<RequestBuilder> {
        let (credentials, endpoint) = self.check_configured()?;
        let token = self.access_token(credentials).await?;
        let url = match key {
            Some(key) => format!("{endpoint}/{}/{}", self.container, uri_encode(key, false)),
            None => format!("{endpoint}/{}", self.container),
        };
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header("x-ms-version", API_VERSION))
    }
}

/// Extract blobs and the continuation marker from a List Blobs body.
pub(crate) fn parse_blob_list(body: &str) -> (Vec<RemoteObject>, Option<String>) {
    let objects = xml::elements(body, "Blob")
        .into_iter()
        .filter_map(|block| {
            let key = xml::unescape(xml::element(block, "Name")?);
            let properties = xml::element(block, "Properties")?;
            let stored = http::parse_http_date(xml::element(properties, "Last-Modified")?.trim())?;
            let metadata = xml::element(block, "Metadata");
            let modified = http::source_mtime(
                metadata.and_then(|m| xml::element(m, http::MTIME_META)),
                stored,
            );
            let size = xml::element(properties, "Content-Length")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0);
            let checksum = metadata
                .and_then(|m| xml::element(m, "sha256"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
            Some(RemoteObject {
                key,
                size,
                modified,
                checksum,
            })
        })
        .collect();

    let next = xml::element(body, "NextMarker")
        .map(|m| xml::unescape(m.trim()))
        .filter(|m| !m.is_empty());
    (objects, next)
}

#[async_trait]
impl StorageBackend for AzureBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    fn is_configured(&self) -> bool {
        self.check_configured().is_ok()
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
        let response = self
            .request(Method::PUT, Some(&key))
            .await?
            .header("x-ms-blob-type", "BlockBlob")
            .header("content-type", "application/octet-stream")
            .header(CHECKSUM_HEADER, compute_bytes_checksum(bytes))
            .header(MTIME_HEADER, http::format_mtime(file.modified))
            .body(bytes.to_vec())
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
        tracing::info!(key = %key, bytes = bytes.len(), "Uploaded to Azure");
        Ok(())
    }

    async fn download(&self, file: &TrackedFile) -> Result<Vec<u8>> {
        ensure_transferable(file)?;
        let key = remote_key(&self.root_folder, file);
        let response = self.request(Method::GET, Some(&key)).await?.send().await?;
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
        let mut marker: Option<String> = None;
        loop {
            let mut query = vec![
                ("restype", "container".to_string()),
                ("comp", "list".to_string()),
                ("prefix", prefix.clone()),
                ("include", "metadata".to_string()),
            ];
            if let Some(m) = marker.take() {
                query.push(("marker", m));
            }
            let response = self.request(Method::GET, None).await?.query(&query).send().await?;
            let status = response.status();
            if is_auth_failure(status) {
                return Err(Error::AuthenticationFailed {
                    message: describe_failure(response).await,
                });
            }
            if !status.is_success() {
                return Err(Error::parse("Azure blob listing", describe_failure(response).await));
            }
            let (page, next) = parse_blob_list(&response.text().await?);
            objects.extend(page);
            match next {
                Some(m) => marker = Some(m),
                None => break,
            }
        }
        tracing::debug!(count = objects.len(), "Listed Azure blobs");
        Ok(objects)
    }

    async fn delete(&self, file: &TrackedFile) -> Result<()> {
        ensure_transferable(file)?;
        let key = remote_key(&self.root_folder, file);
        let response = self.request(Method::DELETE, Some(&key)).await?.send().await?;
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
        let response = self.request(Method::HEAD, Some(&key)).await?.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::DownloadFailed {
                key,
                message: format!("HTTP {}", status.as_u16()),
            });
        }
        let headers = response.headers();
        let stored = header_str(headers, "last-modified")
            .and_then(http::parse_http_date)
            .ok_or_else(|| Error::parse("Last-Modified header", "missing or malformed"))?;
        Ok(Some(RemoteObject {
            size: header_u64(headers, "content-length").unwrap_or(0),
            modified: http::source_mtime(header_str(headers, MTIME_HEADER), stored),
            checksum: header_str(headers, CHECKSUM_HEADER).map(str::to_string),
            key,
        }))
    }

    async fn test_connection(&self) -> bool {
        let request = match self.request(Method::GET, None).await {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Azure connection test failed");
                return false;
            }
        };
        let query = [("restype", "container"), ("comp", "list"), ("maxresults", "1")];
        match request.query(&query).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "Azure connection test rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Azure connection test failed");
                false
            }
        }
    }
}

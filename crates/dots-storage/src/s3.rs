//! S3 and S3-compatible object storage
//!
//! Path-style addressing, `{endpoint}/{bucket}/{key}`, with every request
//! signed by [`RequestSigner`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dots_fs::compute_bytes_checksum;
use dots_meta::{ProviderConfig, ProviderKind, RemoteObject, TrackedFile};
use reqwest::{Client, Method, Response, StatusCode};
use url::Url;

use crate::backend::StorageBackend;
use crate::http::{self, describe_failure, header_str, header_u64, is_auth_failure};
use crate::keys::{config_prefix, ensure_transferable, remote_key};
use crate::signer::{RequestSigner, SignableRequest, amz_date, canonical_query_string, uri_encode};
use crate::{Error, Result, xml};

const SERVICE: &str = "s3";
const CHECKSUM_HEADER: &str = "x-amz-meta-sha256";
const MTIME_HEADER: &str = "x-amz-meta-mtime";

#[derive(Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl S3Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}

pub struct S3Backend {
    kind: ProviderKind,
    client: Client,
    bucket: String,
    region: String,
    root_folder: String,
    /// Scheme and authority, e.g. `https://s3.us-east-1.amazonaws.com`.
    origin: String,
    /// Signed `host` header value.
    host: String,
    /// Path prefix of the endpoint, empty or starting with `/`.
    base_path: String,
    signer: Option<RequestSigner>,
}

impl S3Backend {
    pub fn new(
        config: &ProviderConfig,
        credentials: Option<S3Credentials>,
        timeout: Duration,
    ) -> Result<Self> {
        let region = config.region_or_default().to_string();
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://s3.{region}.amazonaws.com"));
        let url = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| Error::parse("endpoint URL", e))?;
        let host_name = url.host_str().ok_or_else(|| Error::NotConfigured {
            provider: config.kind,
            missing: "endpoint host".into(),
        })?;
        let host = match url.port() {
            Some(port) => format!("{host_name}:{port}"),
            None => host_name.to_string(),
        };

        let signer = credentials
            .filter(S3Credentials::is_complete)
            .map(|c| RequestSigner::new(c.access_key_id, c.secret_access_key, &region, SERVICE));

        Ok(Self {
            kind: config.kind,
            client: http::build_client(timeout)?,
            bucket: config.bucket.clone(),
            root_folder: config.root_folder.clone(),
            origin: format!("{}://{}", url.scheme(), host),
            base_path: url.path().trim_end_matches('/').to_string(),
            host,
            region,
            signer,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn signer(&self) -> Result<&RequestSigner> {
        if self.bucket.is_empty() {
            return Err(Error::NotConfigured {
                provider: self.kind,
                missing: "bucket".into(),
            });
        }
        self.signer.as_ref().ok_or_else(|| Error::NotConfigured {
            provider: self.kind,
            missing: "access key id and secret access key".into(),
        })
    }

    fn object_path(&self, key: Option<&str>) -> String {
        match key {
            Some(key) => format!("{}/{}/{}", self.base_path, self.bucket, uri_encode(key, false)),
            None => format!("{}/{}", self.base_path, self.bucket),
        }
    }

    /// Sign and send one request.
    async fn send(
        &self,
        method: Method,
        key: Option<&str>,
        query: &[(String, String)],
        extra_headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Result<Response> {
        let signer = self.signer()?;
        let path = self.object_path(key);
        let now: DateTime<Utc> = Utc::now();

        let mut headers = vec![
            ("host".to_string(), self.host.clone()),
            (
                "x-amz-content-sha256".to_string(),
                compute_bytes_checksum(&body),
            ),
            ("x-amz-date".to_string(), amz_date(now)),
        ];
        headers.extend(extra_headers);

        let signature = signer.sign(
            &SignableRequest {
                method: method.as_str(),
                path: &path,
                query,
                headers: &headers,
                body: &body,
            },
            now,
        );

        let query_string = canonical_query_string(query);
        let url = if query_string.is_empty() {
            format!("{}{}", self.origin, path)
        } else {
            format!("{}{}?{}", self.origin, path, query_string)
        };

        let mut request = self
            .client
            .request(method, url)
            .header("authorization", signature.authorization);
        for (name, value) in headers.into_iter().filter(|(name, _)| name != "host") {
            request = request.header(name, value);
        }
        Ok(request.body(body).send().await?)
    }

    /// HEAD one object. The reported time is the recorded source mtime when
    /// the object carries one.
    async fn head(&self, key: String) -> Result<Option<RemoteObject>> {
        let response = self
            .send(Method::HEAD, Some(&key), &[], Vec::new(), Vec::new())
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if is_auth_failure(status) {
            return Err(Error::AuthenticationFailed {
                message: format!("HTTP {}", status.as_u16()),
            });
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

    async fn list_page(&self, continuation: Option<String>) -> Result<(Vec<RemoteObject>, Option<String>)> {
        let mut query = vec![
            ("list-type".to_string(), "2".to_string()),
            ("prefix".to_string(), config_prefix(&self.root_folder)),
        ];
        if let Some(token) = continuation {
            query.push(("continuation-token".to_string(), token));
        }

        let response = self.send(Method::GET, None, &query, Vec::new(), Vec::new()).await?;
        let status = response.status();
        if is_auth_failure(status) {
            return Err(Error::AuthenticationFailed {
                message: describe_failure(response).await,
            });
        }
        if !status.is_success() {
            return Err(Error::parse("S3 listing", describe_failure(response).await));
        }

        let body = response.text().await?;
        Ok(parse_list_objects(&body))
    }
}

/// Extract objects and the next continuation token from a ListObjectsV2 body.
pub(crate) fn parse_list_objects(body: &str) -> (Vec<RemoteObject>, Option<String>) {
    let objects = xml::elements(body, "Contents")
        .into_iter()
        .filter_map(|block| {
            let key = xml::unescape(xml::element(block, "Key")?);
            let size = xml::element(block, "Size")?.trim().parse().ok()?;
            let modified = http::parse_http_date(xml::element(block, "LastModified")?.trim())?;
            Some(RemoteObject {
                key,
                size,
                modified,
                checksum: None,
            })
        })
        .filter(|object| !object.key.ends_with('/'))
        .collect();

    let truncated = xml::element(body, "IsTruncated").is_some_and(|v| v.trim() == "true");
    let next = if truncated {
        xml::element(body, "NextContinuationToken").map(xml::unescape)
    } else {
        None
    };
    (objects, next)
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_configured(&self) -> bool {
        self.signer().is_ok()
    }

    fn reports_checksums(&self) -> bool {
        false
    }

    fn root_folder(&self) -> &str {
        &self.root_folder
    }

    async fn upload(&self, file: &TrackedFile, bytes: &[u8]) -> Result<()> {
        ensure_transferable(file)?;
        let key = remote_key(&self.root_folder, file);
        let headers = vec![
            ("content-type".to_string(), "application/octet-stream".to_string()),
            (CHECKSUM_HEADER.to_string(), compute_bytes_checksum(bytes)),
            (MTIME_HEADER.to_string(), http::format_mtime(file.modified)),
        ];

        let response = self
            .send(Method::PUT, Some(&key), &[], headers, bytes.to_vec())
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
        tracing::info!(key = %key, bytes = bytes.len(), "Uploaded to S3");
        Ok(())
    }

    async fn download(&self, file: &TrackedFile) -> Result<Vec<u8>> {
        ensure_transferable(file)?;
        let key = remote_key(&self.root_folder, file);
        let response = self
            .send(Method::GET, Some(&key), &[], Vec::new(), Vec::new())
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
        let mut objects = Vec::new();
        let mut continuation = None;
        loop {
            let (page, next) = self.list_page(continuation).await?;
            objects.extend(page);
            match next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        // ListObjectsV2 carries no user metadata; the source mtime needs a HEAD
        for object in &mut objects {
            if let Some(head) = self.head(object.key.clone()).await? {
                object.modified = head.modified;
            }
        }
        tracing::debug!(count = objects.len(), "Listed S3 objects");
        Ok(objects)
    }

    async fn delete(&self, file: &TrackedFile) -> Result<()> {
        ensure_transferable(file)?;
        let key = remote_key(&self.root_folder, file);
        let response = self
            .send(Method::DELETE, Some(&key), &[], Vec::new(), Vec::new())
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
        self.head(remote_key(&self.root_folder, file)).await
    }

    async fn test_connection(&self) -> bool {
        let query = vec![
            ("list-type".to_string(), "2".to_string()),
            ("max-keys".to_string(), "1".to_string()),
        ];
        match self.send(Method::GET, None, &query, Vec::new(), Vec::new()).await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "S3 connection test rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "S3 connection test failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_list_objects_v2() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>dots</Name>
  <Prefix>dot-sync/configs/</Prefix>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>abc&amp;def</NextContinuationToken>
  <Contents>
    <Key>dot-sync/configs/shell/.zshrc</Key>
    <LastModified>2024-03-01T12:30:00.000Z</LastModified>
    <ETag>"d41d8cd98f00b204e9800998ecf8427e"</ETag>
    <Size>42</Size>
  </Contents>
  <Contents>
    <Key>dot-sync/configs/git/</Key>
    <LastModified>2024-03-01T12:30:00.000Z</LastModified>
    <Size>0</Size>
  </Contents>
</ListBucketResult>"#;

        let (objects, next) = parse_list_objects(body);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "dot-sync/configs/shell/.zshrc");
        assert_eq!(objects[0].size, 42);
        assert_eq!(objects[0].checksum, None);
        assert_eq!(next.as_deref(), Some("abc&def"));
    }

    #[test]
    fn endpoint_defaults_to_regional_aws_host() {
        let config = ProviderConfig {
            bucket: "dots".into(),
            region: Some("eu-west-1".into()),
            ..ProviderConfig::default()
        };
        let backend = S3Backend::new(&config, None, Duration::from_secs(5)).unwrap();
        assert_eq!(backend.origin, "https://s3.eu-west-1.amazonaws.com");
        assert_eq!(backend.host, "s3.eu-west-1.amazonaws.com");
        assert_eq!(backend.object_path(Some("a b/c")), "/dots/a%20b/c");
        assert!(!backend.is_configured());
    }

    #[test]
    fn custom_endpoint_keeps_port_and_path() {
        let config = ProviderConfig {
            kind: ProviderKind::S3Compatible,
            bucket: "dots".into(),
            endpoint: Some("http://127.0.0.1:9000/minio/".into()),
            ..ProviderConfig::default()
        };
        let backend = S3Backend::new(
            &config,
            Some(S3Credentials::new("id", "secret")),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(backend.host, "127.0.0.1:9000");
        assert_eq!(backend.object_path(None), "/minio/dots");
        assert!(backend.is_configured());
    }
}

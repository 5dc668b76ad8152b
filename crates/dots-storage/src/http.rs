//! Shared HTTP plumbing for the network backends

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};

use crate::{Error, Result};

const MAX_ERROR_BODY: usize = 512;

/// Object metadata entry carrying the source file's modification time.
pub(crate) const MTIME_META: &str = "mtime";

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(format!("dotsync/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(Error::Network)
}

/// `HTTP <status>: <body prefix>` for a failed response.
pub(crate) async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), body.trim())
    }
}

pub(crate) fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub(crate) fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    header_str(headers, name).and_then(|v| v.parse().ok())
}

/// Parse the `Last-Modified` style dates HTTP services send.
pub(crate) fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Source modification time in the form stored as object metadata.
pub(crate) fn format_mtime(modified: DateTime<Utc>) -> String {
    modified.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// The recorded source mtime, or the service's own timestamp for objects
/// written without one.
pub(crate) fn source_mtime(recorded: Option<&str>, stored: DateTime<Utc>) -> DateTime<Utc> {
    recorded
        .and_then(|value| parse_http_date(value.trim()))
        .unwrap_or(stored)
}

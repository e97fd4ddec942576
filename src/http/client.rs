//! Replay client
//!
//! Sends raw request bytes to an `HttpService` over reqwest and hands the
//! answer back as raw response bytes.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::str::FromStr;
use std::time::{Duration, Instant};

use super::message::{ParsedRequest, ParsedResponse};
use super::service::HttpService;
use crate::app::ScannerConfig;
use crate::error::{HttpError, UnauthCheckError};

/// Framing headers reqwest manages itself on both sides of a replay
const MANAGED_HEADERS: &[&str] = &["content-length", "transfer-encoding", "connection"];

/// HTTP client wrapper used for replaying captured requests
#[derive(Clone)]
pub struct ReplayClient {
    /// Inner reqwest client
    client: reqwest::Client,

    /// Request timeout in seconds
    timeout_secs: u64,
}

impl ReplayClient {
    /// Create a new replay client
    pub fn new(config: &ScannerConfig) -> Result<Self, UnauthCheckError> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .redirect(redirect)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        builder = match &config.upstream_proxy {
            Some(proxy) => builder.proxy(
                reqwest::Proxy::all(proxy)
                    .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", proxy, e)))?,
            ),
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| HttpError::RequestFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout_secs: config.request_timeout,
        })
    }

    /// Send raw request bytes to `service` and return the raw response
    pub async fn send_raw(
        &self,
        service: &HttpService,
        request: &[u8],
    ) -> Result<Vec<u8>, UnauthCheckError> {
        let start = Instant::now();
        let parsed = ParsedRequest::parse(request)?;

        let method = reqwest::Method::from_str(&parsed.method)
            .map_err(|_| HttpError::RequestFailed(format!("Invalid HTTP method: {}", parsed.method)))?;

        let url = target_url(service, &parsed.target);

        let mut headers = HeaderMap::new();
        for (key, value) in &parsed.headers {
            if MANAGED_HEADERS.contains(&key.to_ascii_lowercase().as_str()) {
                continue;
            }
            let name = HeaderName::from_str(key).map_err(|e| HttpError::InvalidHeader {
                name: key.clone(),
                reason: e.to_string(),
            })?;
            let val = HeaderValue::from_str(value).map_err(|e| HttpError::InvalidHeader {
                name: key.clone(),
                reason: e.to_string(),
            })?;
            headers.append(name, val);
        }

        let mut builder = self.client.request(method, &url).headers(headers);
        if !parsed.body.is_empty() {
            builder = builder.body(parsed.body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;

        let status = response.status();
        let version = http_version(response.version());
        let mut headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter(|(k, _)| !MANAGED_HEADERS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).to_string()))
            .collect();

        // The body arrives decoded, so its framing is rebuilt from its length
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        if !body.is_empty() {
            headers.push(("content-length".to_string(), body.len().to_string()));
        }

        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Replay completed"
        );

        Ok(ParsedResponse {
            version: version.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body: body.to_vec(),
        }
        .to_bytes())
    }

    fn map_error(&self, e: reqwest::Error) -> UnauthCheckError {
        let err = if e.is_timeout() {
            HttpError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            HttpError::ConnectionError(e.to_string())
        } else {
            HttpError::RequestFailed(e.to_string())
        };
        err.into()
    }
}

/// Absolute URL for a request target, always on `service`.
///
/// An absolute-form target only contributes its path and query; its scheme
/// and authority are ignored.
pub fn target_url(service: &HttpService, target: &str) -> String {
    format!("{}{}", service.base_url(), origin_form(target))
}

fn origin_form(target: &str) -> String {
    let lower = target.to_ascii_lowercase();
    let rest = if lower.starts_with("http://") {
        &target["http://".len()..]
    } else if lower.starts_with("https://") {
        &target["https://".len()..]
    } else if target.starts_with('/') {
        return target.to_string();
    } else {
        return format!("/{}", target);
    };

    match rest.find(['/', '?']) {
        Some(i) if rest[i..].starts_with('/') => rest[i..].to_string(),
        Some(i) => format!("/{}", &rest[i..]),
        None => "/".to_string(),
    }
}

fn http_version(version: reqwest::Version) -> &'static str {
    match version {
        reqwest::Version::HTTP_09 => "HTTP/0.9",
        reqwest::Version::HTTP_10 => "HTTP/1.0",
        reqwest::Version::HTTP_2 => "HTTP/2",
        reqwest::Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/1.1",
    }
}

//! HAR (HTTP Archive) import
//!
//! Rebuilds each recorded entry into raw HTTP/1.1 request and response bytes
//! so it can be fed to passive checks like any proxied exchange.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use url::Url;

use crate::error::{Result, ScannerError};
use crate::host::Exchange;
use crate::http::{HttpService, ParsedRequest, ParsedResponse};

/// Headers that describe the recorded transfer rather than the message
const SKIPPED_HEADERS: &[&str] = &["content-length", "transfer-encoding"];

/// Parse a HAR document into exchanges.
///
/// Entries without a recorded response (status 0, or missing) are skipped, as
/// are entries that cannot be rebuilt into an HTTP exchange (WebSocket
/// upgrades to `wss://`, for instance). Only a malformed document is an error.
pub fn import(content: &str) -> Result<Vec<Exchange>> {
    let har: HarFile = serde_json::from_str(content).map_err(|e| ScannerError::ImportError {
        format: "HAR".into(),
        reason: e.to_string(),
    })?;

    let mut exchanges = Vec::with_capacity(har.log.entries.len());
    for entry in &har.log.entries {
        match &entry.response {
            Some(response) if response.status != 0 => {
                match convert_entry(&entry.request, response) {
                    Ok(exchange) => exchanges.push(exchange),
                    Err(e) => {
                        tracing::warn!(url = %entry.request.url, error = %e, "Skipping unusable HAR entry");
                    }
                }
            }
            _ => {
                tracing::debug!(url = %entry.request.url, "Skipping HAR entry without response");
            }
        }
    }

    tracing::info!(entries = har.log.entries.len(), exchanges = exchanges.len(), "Imported HAR");
    Ok(exchanges)
}

fn convert_entry(request: &HarRequest, response: &HarResponse) -> Result<Exchange> {
    let url = Url::parse(&request.url).map_err(|e| ScannerError::ImportError {
        format: "HAR".into(),
        reason: format!("invalid URL {}: {}", request.url, e),
    })?;
    let service = HttpService::from_url(&url)?;

    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut headers = convert_headers(&request.headers);
    if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("host")) {
        let authority = match url.port() {
            Some(port) => format!("{}:{}", service.host, port),
            None => service.host.clone(),
        };
        headers.insert(0, ("Host".to_string(), authority));
    }

    let body = request
        .post_data
        .as_ref()
        .and_then(|p| p.text.clone())
        .unwrap_or_default()
        .into_bytes();
    with_content_length(&mut headers, body.len());

    let raw_request = ParsedRequest {
        method: request.method.to_uppercase(),
        target,
        version: "HTTP/1.1".to_string(),
        headers,
        body,
    }
    .to_bytes();

    let response_body = decode_content(&response.content)?;
    let mut response_headers = convert_headers(&response.headers);
    with_content_length(&mut response_headers, response_body.len());

    let raw_response = ParsedResponse {
        version: "HTTP/1.1".to_string(),
        status: response.status,
        reason: response.status_text.clone(),
        headers: response_headers,
        body: response_body,
    }
    .to_bytes();

    Ok(Exchange::new(service, raw_request, raw_response))
}

/// HTTP/2 pseudo-headers and framing headers are dropped
fn convert_headers(headers: &[HarHeader]) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|h| !h.name.starts_with(':'))
        .filter(|h| !SKIPPED_HEADERS.contains(&h.name.to_ascii_lowercase().as_str()))
        .map(|h| (h.name.clone(), h.value.clone()))
        .collect()
}

fn with_content_length(headers: &mut Vec<(String, String)>, len: usize) {
    if len > 0 {
        headers.push(("Content-Length".to_string(), len.to_string()));
    }
}

fn decode_content(content: &Option<HarContent>) -> Result<Vec<u8>> {
    let Some(content) = content else {
        return Ok(Vec::new());
    };
    let Some(text) = &content.text else {
        return Ok(Vec::new());
    };

    if content.encoding.as_deref() == Some("base64") {
        let decoded = STANDARD.decode(text).map_err(|e| ScannerError::ImportError {
            format: "HAR".into(),
            reason: format!("invalid base64 response body: {}", e),
        })?;
        Ok(decoded)
    } else {
        Ok(text.clone().into_bytes())
    }
}

// HAR file structures

#[derive(Debug, Deserialize)]
struct HarFile {
    log: HarLog,
}

#[derive(Debug, Deserialize)]
struct HarLog {
    entries: Vec<HarEntry>,
}

#[derive(Debug, Deserialize)]
struct HarEntry {
    request: HarRequest,
    #[serde(default)]
    response: Option<HarResponse>,
}

#[derive(Debug, Deserialize)]
struct HarRequest {
    method: String,
    url: String,
    #[serde(default)]
    headers: Vec<HarHeader>,
    #[serde(rename = "postData")]
    post_data: Option<HarPostData>,
}

#[derive(Debug, Deserialize)]
struct HarResponse {
    status: u16,
    #[serde(rename = "statusText", default)]
    status_text: String,
    #[serde(default)]
    headers: Vec<HarHeader>,
    content: Option<HarContent>,
}

#[derive(Debug, Deserialize)]
struct HarHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct HarPostData {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HarContent {
    text: Option<String>,
    encoding: Option<String>,
}

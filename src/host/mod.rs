//! Host contract
//!
//! The check never talks to the network or the issue store directly. It is
//! handed a `Callbacks` implementation at construction and goes through it for
//! replay and message marking, and through `Helpers` for analysing raw bytes.
//! `local` provides a standalone host; tests provide their own doubles.

mod helpers;
pub mod local;

pub use helpers::StandardHelpers;
pub use local::{IssueStore, LocalHost, ScanSummary};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;
use url::Url;

use crate::error::Result;
use crate::http::HttpService;
use crate::scanner::ScannerCheck;

/// An observed request/response pair and the service it went to
pub trait HttpRequestResponse: Send + Sync {
    fn request(&self) -> &[u8];
    fn response(&self) -> &[u8];
    fn http_service(&self) -> &HttpService;
}

/// Analysis helpers over raw messages
pub trait Helpers: Send + Sync {
    /// Status code of a raw response
    fn get_status_code(&self, response: &[u8]) -> Result<u16>;

    /// Full URL of an exchange's request
    fn get_url(&self, exchange: &dyn HttpRequestResponse) -> Result<Url>;
}

/// Services the host offers to registered checks
#[async_trait]
pub trait Callbacks: Send + Sync {
    /// Analysis helpers bound to this host
    fn helpers(&self) -> Arc<dyn Helpers>;

    /// Name shown for the extension in the host
    fn set_extension_name(&self, name: &str);

    /// Add a check to the host's passive scanning pipeline
    fn register_scanner_check(&self, check: Arc<dyn ScannerCheck>);

    /// Send raw request bytes to `service`, returning the raw response
    async fn make_http_request(&self, service: &HttpService, request: &[u8]) -> Result<Vec<u8>>;

    /// Attach request/response highlights to an exchange
    fn apply_markers(
        &self,
        exchange: &dyn HttpRequestResponse,
        request_markers: Option<Vec<Range<usize>>>,
        response_markers: Option<Vec<Range<usize>>>,
    ) -> MarkedExchange;
}

/// Owned exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    #[serde(with = "base64_bytes")]
    pub request: Vec<u8>,

    #[serde(with = "base64_bytes")]
    pub response: Vec<u8>,

    pub service: HttpService,
}

impl Exchange {
    pub fn new(service: HttpService, request: impl Into<Vec<u8>>, response: impl Into<Vec<u8>>) -> Self {
        Self {
            request: request.into(),
            response: response.into(),
            service,
        }
    }

    /// Copy any exchange into an owned one
    pub fn from_message(message: &dyn HttpRequestResponse) -> Self {
        Self::new(
            message.http_service().clone(),
            message.request(),
            message.response(),
        )
    }
}

impl HttpRequestResponse for Exchange {
    fn request(&self) -> &[u8] {
        &self.request
    }

    fn response(&self) -> &[u8] {
        &self.response
    }

    fn http_service(&self) -> &HttpService {
        &self.service
    }
}

/// An exchange with highlighted byte ranges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkedExchange {
    pub exchange: Exchange,
    pub request_markers: Vec<Range<usize>>,
    pub response_markers: Vec<Range<usize>>,
}

impl MarkedExchange {
    /// Mark an exchange, dropping ranges that fall outside the message
    pub fn new(
        exchange: &dyn HttpRequestResponse,
        request_markers: Option<Vec<Range<usize>>>,
        response_markers: Option<Vec<Range<usize>>>,
    ) -> Self {
        let exchange = Exchange::from_message(exchange);
        let request_markers = clamp_markers(request_markers, exchange.request.len());
        let response_markers = clamp_markers(response_markers, exchange.response.len());
        Self {
            exchange,
            request_markers,
            response_markers,
        }
    }
}

fn clamp_markers(markers: Option<Vec<Range<usize>>>, len: usize) -> Vec<Range<usize>> {
    markers
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.start < r.end && r.end <= len)
        .collect()
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

//! Transport/service descriptor for an exchange

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::HttpError;

/// Transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }
}

/// Where an exchange was sent: host, port and protocol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HttpService {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl HttpService {
    pub fn new(host: &str, port: u16, protocol: Protocol) -> Self {
        Self {
            host: host.to_string(),
            port,
            protocol,
        }
    }

    /// Derive the service from an absolute URL
    pub fn from_url(url: &Url) -> Result<Self, HttpError> {
        let protocol = match url.scheme() {
            "http" => Protocol::Http,
            "https" => Protocol::Https,
            other => {
                return Err(HttpError::InvalidUrl(format!(
                    "unsupported scheme '{}' in {}",
                    other, url
                )))
            }
        };

        let host = url
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl(format!("no host in {}", url)))?;

        let port = url.port().unwrap_or_else(|| protocol.default_port());

        Ok(Self::new(host, port, protocol))
    }

    /// Parse a URL string and derive the service from it
    pub fn parse(url: &str) -> Result<Self, HttpError> {
        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(format!("{}: {}", url, e)))?;
        Self::from_url(&parsed)
    }

    /// Scheme, host and port (the port is omitted when it is the default)
    pub fn base_url(&self) -> String {
        if self.port == self.protocol.default_port() {
            format!("{}://{}", self.protocol.as_str(), self.host)
        } else {
            format!("{}://{}:{}", self.protocol.as_str(), self.host, self.port)
        }
    }
}

impl fmt::Display for HttpService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol.as_str(), self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_default_port() {
        let service = HttpService::parse("https://example.com/login").unwrap();
        assert_eq!(service.host, "example.com");
        assert_eq!(service.port, 443);
        assert_eq!(service.protocol, Protocol::Https);
        assert_eq!(service.base_url(), "https://example.com");
    }

    #[test]
    fn test_from_url_explicit_port() {
        let service = HttpService::parse("http://127.0.0.1:8081/").unwrap();
        assert_eq!(service.port, 8081);
        assert_eq!(service.base_url(), "http://127.0.0.1:8081");
        assert_eq!(service.to_string(), "http://127.0.0.1:8081");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            HttpService::parse("ftp://example.com/"),
            Err(HttpError::InvalidUrl(_))
        ));
    }
}

//! Standard analysis helpers

use url::Url;

use super::{Helpers, HttpRequestResponse};
use crate::error::{HttpError, Result};
use crate::http::{message, target_url, ParsedRequest};

/// `Helpers` backed by the crate's raw message parser
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardHelpers;

impl Helpers for StandardHelpers {
    fn get_status_code(&self, response: &[u8]) -> Result<u16> {
        Ok(message::status_code(response)?)
    }

    fn get_url(&self, exchange: &dyn HttpRequestResponse) -> Result<Url> {
        let request = ParsedRequest::parse(exchange.request())?;
        let url = target_url(exchange.http_service(), &request.target);
        let parsed = Url::parse(&url).map_err(|e| HttpError::InvalidUrl(format!("{}: {}", url, e)))?;
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MessageError, UnauthCheckError};
    use crate::host::Exchange;
    use crate::http::{HttpService, Protocol};

    #[test]
    fn test_get_url_uses_service() {
        let exchange = Exchange::new(
            HttpService::new("api.example.com", 8443, Protocol::Https),
            &b"GET /users/7?full=1 HTTP/1.1\r\nHost: api.example.com\r\n\r\n"[..],
            &b"HTTP/1.1 200 OK\r\n\r\n"[..],
        );
        let url = StandardHelpers.get_url(&exchange).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com:8443/users/7?full=1");
        assert_eq!(url.path(), "/users/7");
    }

    #[test]
    fn test_get_status_code_propagates_parse_error() {
        let err = StandardHelpers.get_status_code(b"not http").unwrap_err();
        assert!(matches!(
            err,
            UnauthCheckError::Message(MessageError::MalformedStatusLine(_))
        ));
    }
}

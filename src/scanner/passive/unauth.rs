//! Unauthenticated request check
//!
//! Replays a successful request with its credential headers removed. If the
//! server still answers 200, the endpoint does not enforce authentication.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Consolidation, ScannerCheck};
use crate::app::CheckConfig;
use crate::error::Result;
use crate::host::{Callbacks, Helpers, HttpRequestResponse};
use crate::http::strip_header;
use crate::scanner::findings::{Confidence, Finding, IssueDescriptor, Severity};

/// Name the extension registers under
pub const EXTENSION_NAME: &str = "Unauthenticated Request Check";

/// Issue reported when a stripped replay still succeeds
pub const UNAUTHENTICATED_ACCESS: IssueDescriptor = IssueDescriptor {
    name: "Unauthenticated request successful",
    issue_type: 0,
    severity: Severity::High,
    confidence: Confidence::Certain,
};

pub const UNAUTHENTICATED_EVIDENCE: &str = "Page accessible without authentication";

/// The only status treated as success, for both the original and the replay
const SUCCESS_STATUS: u16 = 200;

/// Strip-and-replay check for endpoints reachable without credentials
pub struct UnauthenticatedAccessCheck {
    callbacks: Arc<dyn Callbacks>,
    helpers: Arc<dyn Helpers>,
    strip_headers: Vec<String>,
}

impl UnauthenticatedAccessCheck {
    pub fn new(callbacks: Arc<dyn Callbacks>, config: &CheckConfig) -> Self {
        let helpers = callbacks.helpers();
        let strip_headers = config
            .strip_headers
            .iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();

        Self {
            callbacks,
            helpers,
            strip_headers,
        }
    }

    /// Header names removed before the replay
    pub fn strip_headers(&self) -> &[String] {
        &self.strip_headers
    }

    /// Only exchanges that originally succeeded are worth replaying
    pub fn should_process(&self, exchange: &dyn HttpRequestResponse) -> Result<bool> {
        let code = self.helpers.get_status_code(exchange.response())?;
        Ok(code == SUCCESS_STATUS)
    }

    /// The original request with every configured credential header removed
    pub fn stripped_request(&self, request: &[u8]) -> Vec<u8> {
        self.strip_headers
            .iter()
            .fold(request.to_vec(), |stripped, name| strip_header(&stripped, name))
    }

    /// Run the check against one exchange.
    ///
    /// Performs at most one replay. Replay and parse failures are returned to
    /// the caller as errors.
    pub async fn check(&self, exchange: &dyn HttpRequestResponse) -> Result<Option<Finding>> {
        if !self.should_process(exchange)? {
            tracing::debug!("Skipping exchange, original response was not 200");
            return Ok(None);
        }

        let url = self.helpers.get_url(exchange)?;
        tracing::info!(path = url.path(), "Scanning");

        let stripped = self.stripped_request(exchange.request());
        let replay = self
            .callbacks
            .make_http_request(exchange.http_service(), &stripped)
            .await?;

        let code = self.helpers.get_status_code(&replay)?;
        if code != SUCCESS_STATUS {
            tracing::debug!(url = %url, status = code, "Authentication enforced");
            return Ok(None);
        }

        tracing::warn!(url = %url, "Endpoint answered without authentication");

        let marked = self.callbacks.apply_markers(exchange, None, None);
        let finding = Finding::new(&UNAUTHENTICATED_ACCESS, url, exchange.http_service().clone())
            .with_detail(UNAUTHENTICATED_EVIDENCE)
            .with_message(marked)
            .with_scanner(EXTENSION_NAME);

        Ok(Some(finding))
    }

    /// Same URL means same issue
    pub fn consolidate(&self, existing: &Finding, incoming: &Finding) -> Consolidation {
        if existing.url == incoming.url {
            Consolidation::KeepExisting
        } else {
            Consolidation::KeepBoth
        }
    }
}

#[async_trait]
impl ScannerCheck for UnauthenticatedAccessCheck {
    fn name(&self) -> &str {
        EXTENSION_NAME
    }

    async fn do_passive_scan(&self, exchange: &dyn HttpRequestResponse) -> Result<Vec<Finding>> {
        Ok(self.check(exchange).await?.into_iter().collect())
    }

    fn consolidate_duplicate_issues(&self, existing: &Finding, incoming: &Finding) -> Consolidation {
        self.consolidate(existing, incoming)
    }
}

/// Name the extension and register the check with the host
pub fn register_extension(
    callbacks: Arc<dyn Callbacks>,
    config: &CheckConfig,
) -> Arc<UnauthenticatedAccessCheck> {
    callbacks.set_extension_name(EXTENSION_NAME);

    let check = Arc::new(UnauthenticatedAccessCheck::new(callbacks.clone(), config));
    callbacks.register_scanner_check(check.clone());
    check
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HttpError, MessageError, UnauthCheckError};
    use crate::host::{Exchange, MarkedExchange, StandardHelpers};
    use crate::http::{HttpService, Protocol};
    use parking_lot::Mutex;
    use std::ops::Range;

    const AUTHENTICATED_REQUEST: &[u8] = b"GET /account/settings HTTP/1.1\r\n\
Host: app.example.com\r\n\
Cookie: session=abc\r\n\
Authorization: Bearer xyz\r\n\
Accept: application/json\r\n\
\r\n";

    /// Host double that records every replay
    struct MockHost {
        replay_response: Option<Vec<u8>>,
        replayed: Mutex<Vec<Vec<u8>>>,
        extension_name: Mutex<Option<String>>,
        checks: Mutex<Vec<Arc<dyn ScannerCheck>>>,
    }

    impl MockHost {
        fn replying(response: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                replay_response: Some(response.to_vec()),
                replayed: Mutex::new(Vec::new()),
                extension_name: Mutex::new(None),
                checks: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                replay_response: None,
                replayed: Mutex::new(Vec::new()),
                extension_name: Mutex::new(None),
                checks: Mutex::new(Vec::new()),
            })
        }

        fn replay_count(&self) -> usize {
            self.replayed.lock().len()
        }

        fn last_replay(&self) -> String {
            String::from_utf8(self.replayed.lock().last().cloned().unwrap_or_default()).unwrap()
        }
    }

    #[async_trait]
    impl Callbacks for MockHost {
        fn helpers(&self) -> Arc<dyn Helpers> {
            Arc::new(StandardHelpers)
        }

        fn set_extension_name(&self, name: &str) {
            *self.extension_name.lock() = Some(name.to_string());
        }

        fn register_scanner_check(&self, check: Arc<dyn ScannerCheck>) {
            self.checks.lock().push(check);
        }

        async fn make_http_request(&self, _service: &HttpService, request: &[u8]) -> Result<Vec<u8>> {
            self.replayed.lock().push(request.to_vec());
            match &self.replay_response {
                Some(response) => Ok(response.clone()),
                None => Err(HttpError::ConnectionError("connection refused".into()).into()),
            }
        }

        fn apply_markers(
            &self,
            exchange: &dyn HttpRequestResponse,
            request_markers: Option<Vec<Range<usize>>>,
            response_markers: Option<Vec<Range<usize>>>,
        ) -> MarkedExchange {
            MarkedExchange::new(exchange, request_markers, response_markers)
        }
    }

    fn exchange(request: &[u8], response: &[u8]) -> Exchange {
        Exchange::new(
            HttpService::new("app.example.com", 443, Protocol::Https),
            request,
            response,
        )
    }

    fn check_for(host: &Arc<MockHost>) -> UnauthenticatedAccessCheck {
        UnauthenticatedAccessCheck::new(host.clone(), &CheckConfig::default())
    }

    #[tokio::test]
    async fn test_stripped_replay_success_reports_finding() {
        let host = MockHost::replying(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n{}");
        let check = check_for(&host);
        let observed = exchange(AUTHENTICATED_REQUEST, b"HTTP/1.1 200 OK\r\n\r\n{}");

        let finding = check.check(&observed).await.unwrap().expect("finding");

        assert_eq!(finding.name, "Unauthenticated request successful");
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.confidence, Confidence::Certain);
        assert_eq!(finding.issue_type, 0);
        assert!(finding.detail.contains("Page accessible without authentication"));
        assert_eq!(finding.url.as_str(), "https://app.example.com/account/settings");
        assert_eq!(finding.service, observed.service);
        assert!(finding.background.is_none());
        assert!(finding.remediation_background.is_none());
        assert_eq!(finding.http_messages.len(), 1);
        assert_eq!(finding.http_messages[0].exchange, observed);
        assert!(finding.http_messages[0].request_markers.is_empty());
        assert!(finding.http_messages[0].response_markers.is_empty());

        assert_eq!(host.replay_count(), 1);
        assert_eq!(
            host.last_replay(),
            "GET /account/settings HTTP/1.1\r\nHost: app.example.com\r\nAccept: application/json\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn test_replay_denied_reports_nothing() {
        let host = MockHost::replying(b"HTTP/1.1 403 Forbidden\r\n\r\n");
        let check = check_for(&host);
        let observed = exchange(AUTHENTICATED_REQUEST, b"HTTP/1.1 200 OK\r\n\r\n");

        assert!(check.check(&observed).await.unwrap().is_none());
        assert_eq!(host.replay_count(), 1);
    }

    #[tokio::test]
    async fn test_replay_redirect_is_not_success() {
        let host = MockHost::replying(b"HTTP/1.1 302 Found\r\nLocation: /login\r\n\r\n");
        let check = check_for(&host);
        let observed = exchange(AUTHENTICATED_REQUEST, b"HTTP/1.1 200 OK\r\n\r\n");

        assert!(check.check(&observed).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_original_is_not_replayed() {
        let host = MockHost::replying(b"HTTP/1.1 200 OK\r\n\r\n");
        let check = check_for(&host);

        for response in [
            &b"HTTP/1.1 404 Not Found\r\n\r\n"[..],
            &b"HTTP/1.1 204 No Content\r\n\r\n"[..],
            &b"HTTP/1.1 301 Moved Permanently\r\n\r\n"[..],
            &b"HTTP/1.1 500 Internal Server Error\r\n\r\n"[..],
        ] {
            let observed = exchange(AUTHENTICATED_REQUEST, response);
            assert!(!check.should_process(&observed).unwrap());
            assert!(check.check(&observed).await.unwrap().is_none());
        }

        assert_eq!(host.replay_count(), 0);
    }

    #[tokio::test]
    async fn test_replay_failure_propagates() {
        let host = MockHost::failing();
        let check = check_for(&host);
        let observed = exchange(AUTHENTICATED_REQUEST, b"HTTP/1.1 200 OK\r\n\r\n");

        let err = check.check(&observed).await.unwrap_err();
        assert!(matches!(err, UnauthCheckError::Http(HttpError::ConnectionError(_))));
        assert_eq!(host.replay_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_original_response_propagates() {
        let host = MockHost::replying(b"HTTP/1.1 200 OK\r\n\r\n");
        let check = check_for(&host);
        let observed = exchange(AUTHENTICATED_REQUEST, b"garbage");

        let err = check.check(&observed).await.unwrap_err();
        assert!(matches!(
            err,
            UnauthCheckError::Message(MessageError::MalformedStatusLine(_))
        ));
        assert_eq!(host.replay_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_replay_response_propagates() {
        let host = MockHost::replying(b"");
        let check = check_for(&host);
        let observed = exchange(AUTHENTICATED_REQUEST, b"HTTP/1.1 200 OK\r\n\r\n");

        let err = check.check(&observed).await.unwrap_err();
        assert!(matches!(err, UnauthCheckError::Message(MessageError::Empty)));
    }

    #[tokio::test]
    async fn test_literal_authorize_header_kept_by_default() {
        let host = MockHost::replying(b"HTTP/1.1 401 Unauthorized\r\n\r\n");
        let check = check_for(&host);
        let request = b"GET /api HTTP/1.1\r\nHost: h\r\nAuthorize: token\r\n\r\n";

        check
            .check(&exchange(request, b"HTTP/1.1 200 OK\r\n\r\n"))
            .await
            .unwrap();

        assert!(host.last_replay().contains("Authorize: token\r\n"));
    }

    #[tokio::test]
    async fn test_literal_authorize_header_stripped_when_configured() {
        let host = MockHost::replying(b"HTTP/1.1 401 Unauthorized\r\n\r\n");
        let config = CheckConfig {
            strip_headers: vec!["Cookie".into(), "Authorization".into(), "Authorize".into()],
        };
        let check = UnauthenticatedAccessCheck::new(host.clone(), &config);
        let request = b"GET /api HTTP/1.1\r\nHost: h\r\nAuthorize: token\r\nAuthorization: Basic dTpw\r\n\r\n";

        check
            .check(&exchange(request, b"HTTP/1.1 200 OK\r\n\r\n"))
            .await
            .unwrap();

        assert_eq!(host.last_replay(), "GET /api HTTP/1.1\r\nHost: h\r\n\r\n");
    }

    #[test]
    fn test_stripped_request_preserves_body() {
        let host = MockHost::replying(b"HTTP/1.1 200 OK\r\n\r\n");
        let check = check_for(&host);
        let request = b"POST /x HTTP/1.1\r\nCookie: a=1\r\nContent-Length: 13\r\n\r\nCookie: a=1\r\n";

        assert_eq!(
            check.stripped_request(request),
            b"POST /x HTTP/1.1\r\nContent-Length: 13\r\n\r\nCookie: a=1\r\n"
        );
    }

    #[test]
    fn test_blank_strip_entries_are_ignored() {
        let host = MockHost::replying(b"HTTP/1.1 200 OK\r\n\r\n");
        let config = CheckConfig {
            strip_headers: vec![" Cookie ".into(), "".into()],
        };
        let check = UnauthenticatedAccessCheck::new(host, &config);
        assert_eq!(check.strip_headers(), ["Cookie".to_string()]);
    }

    #[tokio::test]
    async fn test_do_passive_scan_wraps_check() {
        let host = MockHost::replying(b"HTTP/1.1 200 OK\r\n\r\n");
        let check = check_for(&host);

        let hit = exchange(AUTHENTICATED_REQUEST, b"HTTP/1.1 200 OK\r\n\r\n");
        assert_eq!(check.do_passive_scan(&hit).await.unwrap().len(), 1);

        let miss = exchange(AUTHENTICATED_REQUEST, b"HTTP/1.1 404 Not Found\r\n\r\n");
        assert!(check.do_passive_scan(&miss).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_consolidate_by_url() {
        let host = MockHost::replying(b"HTTP/1.1 200 OK\r\n\r\n");
        let check = check_for(&host);

        let first = check
            .check(&exchange(AUTHENTICATED_REQUEST, b"HTTP/1.1 200 OK\r\n\r\n"))
            .await
            .unwrap()
            .unwrap();
        let same = check
            .check(&exchange(AUTHENTICATED_REQUEST, b"HTTP/1.1 200 OK\r\n\r\n"))
            .await
            .unwrap()
            .unwrap();
        let other_query = check
            .check(&exchange(
                b"GET /account/settings?tab=2 HTTP/1.1\r\nHost: app.example.com\r\n\r\n",
                b"HTTP/1.1 200 OK\r\n\r\n",
            ))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(check.consolidate_duplicate_issues(&first, &same), Consolidation::KeepExisting);
        assert_eq!(
            check.consolidate_duplicate_issues(&first, &same).as_host_code(),
            -1
        );
        assert_eq!(check.consolidate(&first, &other_query), Consolidation::KeepBoth);
        assert_eq!(check.consolidate(&first, &other_query).as_host_code(), 0);
    }

    #[test]
    fn test_register_extension() {
        let host = MockHost::replying(b"HTTP/1.1 200 OK\r\n\r\n");
        let check = register_extension(host.clone(), &CheckConfig::default());

        assert_eq!(
            host.extension_name.lock().as_deref(),
            Some("Unauthenticated Request Check")
        );
        let registered = host.checks.lock();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].name(), check.name());
    }
}

//! Raw request/response file pairs

use std::path::Path;

use crate::error::{Result, ResultExt};
use crate::host::Exchange;
use crate::http::HttpService;

/// Load one exchange from files holding the raw request and response bytes.
///
/// `url` names the service the request was sent to; only its scheme, host
/// and port are used.
pub fn load(request_path: &Path, response_path: &Path, url: &str) -> Result<Exchange> {
    let service = HttpService::parse(url)?;

    let request = std::fs::read(request_path)
        .with_context(format!("Failed to read request from {}", request_path.display()))?;
    let response = std::fs::read(response_path)
        .with_context(format!("Failed to read response from {}", response_path.display()))?;

    Ok(Exchange::new(service, request, response))
}

//! Standalone host
//!
//! Plays the role of the proxy application when the check runs outside one:
//! replays over reqwest, keeps registered checks, and stores findings with
//! duplicate consolidation.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::ops::Range;
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::{Callbacks, Exchange, Helpers, HttpRequestResponse, MarkedExchange, StandardHelpers};
use crate::app::ScannerConfig;
use crate::error::Result;
use crate::http::{HttpService, ReplayClient};
use crate::scanner::{Consolidation, Finding, PassiveScanner, ScannerCheck};

/// Counters for a passive scan run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Exchanges handed to the checks
    pub scanned: usize,
    /// Findings returned by checks
    pub reported: usize,
    /// Findings kept after consolidation
    pub stored: usize,
    /// Check invocations that failed
    pub errors: usize,
}

impl ScanSummary {
    fn merge(&mut self, other: &ScanSummary) {
        self.scanned += other.scanned;
        self.reported += other.reported;
        self.stored += other.stored;
        self.errors += other.errors;
    }
}

/// Issue store with per-check duplicate consolidation
#[derive(Default)]
pub struct IssueStore {
    issues: RwLock<Vec<Finding>>,
}

impl IssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a finding from `check`.
    ///
    /// Every stored finding from the same check at the same origin and path is
    /// offered to the check's consolidation first. Returns whether the
    /// incoming finding was kept.
    pub fn add(&self, check: &dyn ScannerCheck, incoming: Finding) -> bool {
        let mut issues = self.issues.write();
        let mut replace = None;

        for (index, existing) in issues.iter().enumerate() {
            if existing.scanner != check.name() || !same_location(existing, &incoming) {
                continue;
            }

            match check.consolidate_duplicate_issues(existing, &incoming) {
                Consolidation::KeepExisting => {
                    tracing::debug!(url = %incoming.url, "Duplicate finding suppressed");
                    return false;
                }
                Consolidation::KeepIncoming => {
                    replace = Some(index);
                    break;
                }
                Consolidation::KeepBoth => {}
            }
        }

        match replace {
            Some(index) => issues[index] = incoming,
            None => issues.push(incoming),
        }
        true
    }

    /// Get all findings
    pub fn findings(&self) -> Vec<Finding> {
        self.issues.read().clone()
    }

    pub fn len(&self) -> usize {
        self.issues.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.read().is_empty()
    }
}

fn same_location(a: &Finding, b: &Finding) -> bool {
    a.url.origin() == b.url.origin() && a.url_path() == b.url_path()
}

/// Host implementation backed by a reqwest replay client
pub struct LocalHost {
    client: ReplayClient,
    helpers: Arc<StandardHelpers>,
    extension_name: RwLock<Option<String>>,
    scanner: RwLock<PassiveScanner>,
    issues: IssueStore,
    max_concurrent: usize,
}

impl LocalHost {
    pub fn new(config: &ScannerConfig) -> Result<Arc<Self>> {
        Ok(Arc::new(Self {
            client: ReplayClient::new(config)?,
            helpers: Arc::new(StandardHelpers),
            extension_name: RwLock::new(None),
            scanner: RwLock::new(PassiveScanner::new()),
            issues: IssueStore::new(),
            max_concurrent: config.max_concurrent.max(1),
        }))
    }

    pub fn extension_name(&self) -> Option<String> {
        self.extension_name.read().clone()
    }

    pub fn check_names(&self) -> Vec<String> {
        self.scanner
            .read()
            .check_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn issues(&self) -> &IssueStore {
        &self.issues
    }

    /// Run every registered check against one exchange.
    ///
    /// A failing check is logged and counted; the other checks still run.
    pub async fn passive_scan(&self, exchange: &Exchange) -> ScanSummary {
        let checks = self.scanner.read().checks().to_vec();
        let mut summary = ScanSummary {
            scanned: 1,
            ..Default::default()
        };

        for check in checks {
            match check.do_passive_scan(exchange).await {
                Ok(findings) => {
                    for finding in findings {
                        summary.reported += 1;
                        if self.issues.add(check.as_ref(), finding) {
                            summary.stored += 1;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(
                        check = check.name(),
                        service = %exchange.service,
                        error = %e,
                        "Passive check failed"
                    );
                    summary.errors += 1;
                }
            }
        }

        summary
    }

    /// Passive-scan a batch of exchanges, at most `max_concurrent` at a time
    pub async fn scan_all(self: &Arc<Self>, exchanges: Vec<Exchange>) -> ScanSummary {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(exchanges.len());

        for exchange in exchanges {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let host = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                let summary = host.passive_scan(&exchange).await;
                drop(permit);
                summary
            }));
        }

        let mut total = ScanSummary::default();
        for handle in handles {
            match handle.await {
                Ok(summary) => total.merge(&summary),
                Err(e) => {
                    tracing::error!(error = %e, "Scan task panicked");
                    total.errors += 1;
                }
            }
        }

        tracing::info!(
            scanned = total.scanned,
            reported = total.reported,
            stored = total.stored,
            errors = total.errors,
            "Passive scan finished"
        );

        total
    }
}

#[async_trait]
impl Callbacks for LocalHost {
    fn helpers(&self) -> Arc<dyn Helpers> {
        self.helpers.clone()
    }

    fn set_extension_name(&self, name: &str) {
        tracing::info!(name, "Extension loaded");
        *self.extension_name.write() = Some(name.to_string());
    }

    fn register_scanner_check(&self, check: Arc<dyn ScannerCheck>) {
        self.scanner.write().register(check);
    }

    async fn make_http_request(&self, service: &HttpService, request: &[u8]) -> Result<Vec<u8>> {
        self.client.send_raw(service, request).await
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

//! Passive scanning
//!
//! Checks registered here look at traffic the host already observed.

mod unauth;

pub use unauth::{
    register_extension, UnauthenticatedAccessCheck, EXTENSION_NAME, UNAUTHENTICATED_ACCESS,
    UNAUTHENTICATED_EVIDENCE,
};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::host::HttpRequestResponse;
use crate::scanner::findings::Finding;

/// What the host should do with two findings from the same check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consolidation {
    /// Drop the incoming finding
    KeepExisting,
    /// Report both
    KeepBoth,
    /// Replace the existing finding with the incoming one
    KeepIncoming,
}

impl Consolidation {
    /// Integer form used by hosts that speak -1/0/1
    pub fn as_host_code(&self) -> i32 {
        match self {
            Consolidation::KeepExisting => -1,
            Consolidation::KeepBoth => 0,
            Consolidation::KeepIncoming => 1,
        }
    }
}

/// Trait for checks the host drives during passive scanning
#[async_trait]
pub trait ScannerCheck: Send + Sync {
    /// Check name
    fn name(&self) -> &str;

    /// Scan an observed exchange; an empty list means nothing to report
    async fn do_passive_scan(&self, exchange: &dyn HttpRequestResponse) -> Result<Vec<Finding>>;

    /// Decide between two findings this check reported for the same URL path
    fn consolidate_duplicate_issues(&self, existing: &Finding, incoming: &Finding) -> Consolidation;
}

/// Registered passive checks
#[derive(Default, Clone)]
pub struct PassiveScanner {
    checks: Vec<Arc<dyn ScannerCheck>>,
}

impl PassiveScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, check: Arc<dyn ScannerCheck>) {
        tracing::info!(check = check.name(), "Registered scanner check");
        self.checks.push(check);
    }

    pub fn checks(&self) -> &[Arc<dyn ScannerCheck>] {
        &self.checks
    }

    /// Get list of check names
    pub fn check_names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }
}

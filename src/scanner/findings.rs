//! Scan findings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::host::MarkedExchange;
use crate::http::HttpService;

/// Severity level for findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Information,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Information => "Information",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "info" | "information" | "informational" => Some(Severity::Information),
            _ => None,
        }
    }
}

/// How sure a check is about a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    Tentative,
    Firm,
    Certain,
}

impl Confidence {
    pub fn name(&self) -> &'static str {
        match self {
            Confidence::Tentative => "Tentative",
            Confidence::Firm => "Firm",
            Confidence::Certain => "Certain",
        }
    }
}

/// The fixed identity of the issues a check reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueDescriptor {
    pub name: &'static str,
    pub issue_type: u32,
    pub severity: Severity,
    pub confidence: Confidence,
}

/// A reported issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Unique ID
    pub id: String,

    /// URL of the affected exchange
    pub url: Url,

    /// Issue name
    pub name: String,

    /// Host-defined issue type code
    pub issue_type: u32,

    pub severity: Severity,

    pub confidence: Confidence,

    /// Human-readable evidence
    pub detail: String,

    pub background: Option<String>,

    pub remediation_background: Option<String>,

    pub remediation_detail: Option<String>,

    /// Exchanges supporting the finding, as marked by the host
    pub http_messages: Vec<MarkedExchange>,

    /// Service the exchange went to
    pub service: HttpService,

    /// Check that produced this finding
    pub scanner: String,

    pub timestamp: DateTime<Utc>,
}

impl Finding {
    /// Create a new finding from a check's issue descriptor
    pub fn new(descriptor: &IssueDescriptor, url: Url, service: HttpService) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url,
            name: descriptor.name.to_string(),
            issue_type: descriptor.issue_type,
            severity: descriptor.severity,
            confidence: descriptor.confidence,
            detail: String::new(),
            background: None,
            remediation_background: None,
            remediation_detail: None,
            http_messages: Vec::new(),
            service,
            scanner: "manual".to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Builder pattern methods
    pub fn with_detail(mut self, detail: &str) -> Self {
        self.detail = detail.to_string();
        self
    }

    pub fn with_message(mut self, message: MarkedExchange) -> Self {
        self.http_messages.push(message);
        self
    }

    pub fn with_scanner(mut self, scanner: &str) -> Self {
        self.scanner = scanner.to_string();
        self
    }

    /// Path component of the URL, the unit hosts group duplicates by
    pub fn url_path(&self) -> &str {
        self.url.path()
    }
}

/// Finding filter for report output
#[derive(Debug, Default)]
pub struct FindingFilter {
    pub min_severity: Option<Severity>,
    pub url_contains: Option<String>,
}

impl FindingFilter {
    pub fn matches(&self, finding: &Finding) -> bool {
        if let Some(min_severity) = self.min_severity {
            if finding.severity < min_severity {
                return false;
            }
        }

        if let Some(url_filter) = &self.url_contains {
            if !finding.url.as_str().contains(url_filter) {
                return false;
            }
        }

        true
    }
}

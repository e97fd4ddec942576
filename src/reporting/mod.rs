//! Report Generation Module
//!
//! Renders stored findings for the CLI:
//! - Text (terminal-friendly summary)
//! - JSON (machine-readable)

pub mod formats;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::app::ReportFormat;
use crate::host::ScanSummary;
use crate::scanner::Finding;

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report title
    pub title: String,
    /// Where the scanned traffic came from
    pub source: String,
    /// Scan start time
    pub start_time: DateTime<Utc>,
    /// Scan end time
    pub end_time: DateTime<Utc>,
    /// Scanner version
    pub scanner_version: String,
    /// Report generation time
    pub generated_at: DateTime<Utc>,
}

impl Default for ReportMetadata {
    fn default() -> Self {
        Self {
            title: "Unauthenticated Request Check".to_string(),
            source: String::new(),
            start_time: Utc::now(),
            end_time: Utc::now(),
            scanner_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
        }
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of findings
    pub total_findings: usize,
    /// Findings by severity name
    pub by_severity: BTreeMap<String, usize>,
    /// Number of unique hosts
    pub unique_hosts: usize,
    /// Number of unique URLs
    pub unique_urls: usize,
    /// Exchanges handed to the checks
    pub exchanges_scanned: usize,
    /// Check invocations that failed
    pub errors: usize,
    /// Scan duration in seconds
    pub duration_secs: u64,
}

impl ReportSummary {
    /// Calculate summary from findings and scan counters
    pub fn from_findings(findings: &[Finding], scan: &ScanSummary, metadata: &ReportMetadata) -> Self {
        let mut by_severity: BTreeMap<String, usize> = BTreeMap::new();
        let mut hosts: HashSet<&str> = HashSet::new();
        let mut urls: HashSet<&str> = HashSet::new();

        for finding in findings {
            *by_severity
                .entry(finding.severity.name().to_string())
                .or_insert(0) += 1;

            if let Some(host) = finding.url.host_str() {
                hosts.insert(host);
            }
            urls.insert(finding.url.as_str());
        }

        let duration = metadata.end_time.signed_duration_since(metadata.start_time);

        Self {
            total_findings: findings.len(),
            by_severity,
            unique_hosts: hosts.len(),
            unique_urls: urls.len(),
            exchanges_scanned: scan.scanned,
            errors: scan.errors,
            duration_secs: duration.num_seconds().max(0) as u64,
        }
    }
}

/// Complete scan report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// Summary statistics
    pub summary: ReportSummary,
    /// All findings
    pub findings: Vec<Finding>,
}

impl ScanReport {
    /// Create a new report from findings
    pub fn new(findings: Vec<Finding>, scan: &ScanSummary, metadata: ReportMetadata) -> Self {
        let summary = ReportSummary::from_findings(&findings, scan, &metadata);

        Self {
            metadata,
            summary,
            findings,
        }
    }

    /// Export to JSON format
    pub fn to_json(&self) -> Result<String> {
        formats::json::generate(self)
    }

    /// Export to plain text
    pub fn to_text(&self) -> Result<String> {
        formats::text::generate(self)
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => self.to_text(),
            ReportFormat::Json => self.to_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpService, Protocol};
    use crate::scanner::passive::UNAUTHENTICATED_ACCESS;
    use url::Url;

    pub(crate) fn sample_findings() -> Vec<Finding> {
        ["https://a.example.com/x", "https://a.example.com/y", "https://b.example.com/x"]
            .iter()
            .map(|u| {
                Finding::new(
                    &UNAUTHENTICATED_ACCESS,
                    Url::parse(u).unwrap(),
                    HttpService::new("a.example.com", 443, Protocol::Https),
                )
                .with_detail("Page accessible without authentication")
            })
            .collect()
    }

    #[test]
    fn test_summary_counts() {
        let scan = ScanSummary {
            scanned: 10,
            reported: 4,
            stored: 3,
            errors: 1,
        };
        let report = ScanReport::new(sample_findings(), &scan, ReportMetadata::default());

        assert_eq!(report.summary.total_findings, 3);
        assert_eq!(report.summary.by_severity.get("High"), Some(&3));
        assert_eq!(report.summary.unique_hosts, 2);
        assert_eq!(report.summary.unique_urls, 3);
        assert_eq!(report.summary.exchanges_scanned, 10);
        assert_eq!(report.summary.errors, 1);
    }
}

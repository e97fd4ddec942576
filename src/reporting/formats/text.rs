//! Plain text report for terminals

use anyhow::Result;
use std::fmt::Write;

use crate::reporting::ScanReport;

/// Generate text report
pub fn generate(report: &ScanReport) -> Result<String> {
    let mut out = String::new();

    writeln!(out, "{}", report.metadata.title)?;
    writeln!(out, "{}", "=".repeat(report.metadata.title.len()))?;
    if !report.metadata.source.is_empty() {
        writeln!(out, "Source:    {}", report.metadata.source)?;
    }
    writeln!(out, "Scanned:   {} exchanges", report.summary.exchanges_scanned)?;
    writeln!(out, "Errors:    {}", report.summary.errors)?;
    writeln!(out, "Findings:  {}", report.summary.total_findings)?;
    writeln!(out)?;

    if report.findings.is_empty() {
        writeln!(out, "No unauthenticated endpoints found.")?;
        return Ok(out);
    }

    for (index, finding) in report.findings.iter().enumerate() {
        writeln!(
            out,
            "[{}] {} ({}, {})",
            index + 1,
            finding.name,
            finding.severity.name(),
            finding.confidence.name()
        )?;
        writeln!(out, "    URL:     {}", finding.url)?;
        writeln!(out, "    Service: {}", finding.service)?;
        writeln!(out, "    Detail:  {}", finding.detail)?;
    }

    Ok(out)
}

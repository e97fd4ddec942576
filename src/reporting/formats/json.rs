//! JSON Report Generator
//!
//! Generates machine-readable JSON reports.

use anyhow::Result;

use crate::reporting::ScanReport;

/// Generate JSON report
pub fn generate(report: &ScanReport) -> Result<String> {
    let json = serde_json::to_string_pretty(report)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ScanSummary;
    use crate::reporting::tests::sample_findings;
    use crate::reporting::ReportMetadata;

    #[test]
    fn test_generate_json_report() {
        let report = ScanReport::new(sample_findings(), &ScanSummary::default(), ReportMetadata::default());

        let json = generate(&report).unwrap();
        assert!(json.contains("Unauthenticated request successful"));
        assert!(json.contains("\"severity\": \"High\""));
        assert!(json.contains("\"confidence\": \"Certain\""));

        let back: ScanReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.findings.len(), 3);
    }
}

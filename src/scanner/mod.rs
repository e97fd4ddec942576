//! Security scanner module
//!
//! Findings and the passive checks that produce them.

mod findings;
pub mod passive;

pub use findings::{Confidence, Finding, FindingFilter, IssueDescriptor, Severity};
pub use passive::{
    register_extension, Consolidation, PassiveScanner, ScannerCheck, UnauthenticatedAccessCheck,
};

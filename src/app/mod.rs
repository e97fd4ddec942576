//! Application configuration
//!
//! Settings shared by the standalone host and the CLI.

mod config;

pub use config::{CheckConfig, Config, GeneralConfig, ReportFormat, ScannerConfig};

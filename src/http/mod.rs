//! HTTP plumbing
//!
//! Raw message parsing and header stripping, the service descriptor,
//! and the reqwest-backed replay client used by the standalone host.

mod client;
pub mod message;
mod service;

pub use client::{target_url, ReplayClient};
pub use message::{status_code, strip_header, ParsedRequest, ParsedResponse};
pub use service::{HttpService, Protocol};

//! unauth-check - Unauthenticated Request Check
//!
//! A passive scanner check for intercepting proxies. Every exchange whose
//! response was `200` is replayed with its credential headers (`Cookie`,
//! `Authorization`) removed; if the replay is still answered with `200`, the
//! endpoint is reported as reachable without authentication.
//!
//! The check talks to its host only through the traits in [`host`]. A host
//! registers it with [`scanner::register_extension`] and then calls
//! [`scanner::ScannerCheck::do_passive_scan`] per observed exchange.
//! [`host::LocalHost`] is a standalone host that replays over reqwest.

pub mod app;
pub mod error;
pub mod host;
pub mod http;
pub mod reporting;
pub mod scanner;
pub mod traffic;

pub use error::{ConfigError, HttpError, MessageError, ScannerError, UnauthCheckError};

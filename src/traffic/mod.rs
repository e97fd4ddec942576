//! Traffic sources for the standalone host

pub mod har;
pub mod raw;

//! Report output formats

pub mod json;
pub mod text;

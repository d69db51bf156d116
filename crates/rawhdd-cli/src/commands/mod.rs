//! CLI command implementations

pub mod config;
pub mod image;
pub mod probe;

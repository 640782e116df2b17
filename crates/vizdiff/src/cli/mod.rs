//! CLI command implementations.

pub mod config;
pub mod diff;
pub mod run;

//! Subcommand implementations.

pub mod data;
pub mod plan;
pub mod report;

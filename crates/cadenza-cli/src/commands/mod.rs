//! Subcommand implementations.

pub mod explain;
pub mod query;
pub mod status;

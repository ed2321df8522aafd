//! Subcommand implementations

pub mod forecast;
pub mod rag;

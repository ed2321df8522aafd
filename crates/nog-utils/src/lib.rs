//! Shared utilities for the NOG toolkit
//!
//! This crate provides common functionality used across the workspace,
//! including logging setup and resolution of the on-disk data directory.

pub mod config;
pub mod logging;

pub use config::Config;
pub use logging::init_tracing;

//! Shared library for the anime-search workspace.
//!
//! This crate provides common functionality used by the search client:
//! - Configuration management
//! - Catalog domain models and load states
//! - Logging infrastructure

pub mod config;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use logging::LogConfig;
pub use models::*;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;

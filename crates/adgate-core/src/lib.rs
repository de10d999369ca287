//! Adgate Core Library
//!
//! Core types, traits, and configuration for the adgate directory gateway.

pub mod config;
pub mod directory;
pub mod error;
pub mod query;
pub mod types;

pub use config::AdgateConfig;
pub use directory::Directory;
pub use error::{DirectoryError, DirectoryResult, Error, Result};
pub use query::QueryOptions;

/// Adgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default maximum age of a signed request (10 minutes)
pub const DEFAULT_MAX_INTERVAL_SECS: u64 = 600;

/// Default limit for buffered request bodies (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

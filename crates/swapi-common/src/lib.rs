//! SWAPI Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the SWAPI ingestion workspace.
//!
//! - **Logging**: `tracing` subscriber setup driven by environment variables
//! - **Errors**: configuration error type and environment helpers
//!
//! # Example
//!
//! ```no_run
//! use swapi_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{env_or, ConfigError, Result};

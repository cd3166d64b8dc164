//! Session Configuration Module
//!
//! Provides the configuration a tracking session is constructed from. There is
//! no process-wide config: each session owns the [`SessionConfig`] it was
//! built with, so independent sessions can coexist.
//!
//! ## Loading Order
//!
//! 1. `LOCATION_ANALYTICS_CONFIG` environment variable (path to TOML file)
//! 2. `location_analytics.toml` in the current working directory
//! 3. Environment variables only
//!
//! ## Usage
//!
//! ```ignore
//! let config = SessionConfig::new("https://analytics.example.com/", "api-key")?;
//! let config = SessionConfig { interval_ms: 300_000, ..config };
//! ```

mod session_config;
pub mod defaults;

pub use session_config::*;

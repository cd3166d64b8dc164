//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Sampling
// ============================================================================

/// Default sampling interval (ms). 600 000 = 10 minutes.
pub const DEFAULT_INTERVAL_MS: i64 = 600_000;

/// Slack added to the interval to form the provider's maximum batching delay (ms).
///
/// `bounded_delay = interval + BOUNDED_DELAY_SLACK_MS`
pub const BOUNDED_DELAY_SLACK_MS: i64 = 60_000;

// ============================================================================
// Delivery
// ============================================================================

/// Fixed delay before re-attempting a failed batch delivery (ms).
///
/// No backoff and no attempt cap: a permanently failing endpoint retries forever.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 30_000;

/// HTTP client timeout for analytics server requests (seconds).
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Session Actor
// ============================================================================

/// Command mailbox depth for a tracking session.
pub const SESSION_COMMAND_CAPACITY: usize = 64;

/// Fixes handled back to back before pending commands, delivery outcomes and
/// a due retry get a turn.
pub const FIX_BURST_LIMIT: usize = 32;

// ============================================================================
// Config Discovery
// ============================================================================

/// Environment variable naming an explicit config file path.
pub const CONFIG_PATH_ENV: &str = "LOCATION_ANALYTICS_CONFIG";

/// Config file looked up in the working directory when no path is given.
pub const LOCAL_CONFIG_FILE: &str = "location_analytics.toml";

pub const SERVER_URL_ENV: &str = "LOCATION_ANALYTICS_SERVER_URL";
pub const API_KEY_ENV: &str = "LOCATION_ANALYTICS_API_KEY";
pub const INTERVAL_MS_ENV: &str = "LOCATION_ANALYTICS_INTERVAL_MS";

//! location-analytics - position sampling and sync client
//!
//! # Usage
//!
//! ```bash
//! # Replay JSON fixes from stdin (one RawFix per line) and sync them
//! replay_fixes.py | location-analytics track --user u1
//!
//! # Print the server-side statistics summary for a user
//! location-analytics stats --user u1
//! ```
//!
//! # Environment Variables
//!
//! - `LOCATION_ANALYTICS_CONFIG`: Path to a TOML session config
//! - `LOCATION_ANALYTICS_SERVER_URL` / `LOCATION_ANALYTICS_API_KEY`: Endpoint overrides
//! - `LOCATION_ANALYTICS_INTERVAL_MS`: Sampling interval override
//! - `RUST_LOG`: Logging level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::{info, warn};

use location_analytics::source::{feed_json_lines, AlwaysGranted, ChannelFixSource};
use location_analytics::{session, HttpTransport, SessionConfig, StatisticsClient, SyncPhase};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "location-analytics")]
#[command(about = "Position sampling and reliable sync to a location analytics server")]
#[command(version)]
struct CliArgs {
    /// Server base URL (overrides config file and environment)
    #[arg(long, global = true)]
    server: Option<String>,

    /// API key (overrides config file and environment)
    #[arg(long, global = true, env = "LOCATION_ANALYTICS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Read JSON fixes from stdin, gate, buffer and sync them until EOF
    Track {
        /// Subject identifier attached to every sample
        #[arg(long)]
        user: String,
        /// Sampling interval in milliseconds
        #[arg(long)]
        interval_ms: Option<i64>,
        /// Seconds to wait after EOF for outstanding deliveries
        #[arg(long, default_value = "10")]
        drain_secs: u64,
    },

    /// Fetch and print the statistics summary for a user
    Stats {
        /// Subject identifier
        #[arg(long)]
        user: String,
    },
}

// ============================================================================
// Configuration
// ============================================================================

/// Resolve the session config: file/env first, CLI flags last.
fn resolve_config(args: &CliArgs) -> Result<SessionConfig> {
    let loaded = SessionConfig::load();

    let config = match (loaded, &args.server, &args.api_key) {
        (Ok(config), None, None) => config,
        (Ok(config), server, key) => SessionConfig {
            server_url: server.clone().unwrap_or(config.server_url),
            api_key: key.clone().unwrap_or(config.api_key),
            ..config
        },
        (Err(e), Some(server), Some(key)) => {
            warn!(error = %e, "No usable config file/environment, using CLI endpoint");
            SessionConfig::new(server.clone(), key.clone())?
        }
        (Err(e), _, _) => return Err(e).context("Failed to load session config"),
    };

    config.validate().context("Invalid session config")?;
    Ok(config)
}

// ============================================================================
// Commands
// ============================================================================

async fn run_track(config: SessionConfig, user: &str, drain_secs: u64) -> Result<()> {
    let transport = Arc::new(HttpTransport::new(&config).context("Failed to build HTTP transport")?);
    let (source, feeder) = ChannelFixSource::new();

    let handle = session::spawn(&config, transport, Box::new(source), Arc::new(AlwaysGranted));
    handle.set_subject_id(user);
    handle.start().await.context("Failed to start tracking")?;

    info!(server = %config.server_url, interval_ms = config.interval_ms, "Tracking from stdin");

    let reader = BufReader::new(tokio::io::stdin());
    tokio::select! {
        fed = feed_json_lines(reader, &feeder) => {
            let count = fed.context("Failed reading fixes from stdin")?;
            info!(fixes = count, "Stdin closed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    handle.stop().await.context("Failed to stop tracking")?;

    // Give the final flush a chance to land
    let deadline = tokio::time::Instant::now() + Duration::from_secs(drain_secs);
    loop {
        let status = handle.status().await?;
        if status.phase == SyncPhase::Idle && status.buffered == 0 {
            info!("All samples delivered");
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            warn!(
                buffered = status.buffered,
                phase = %status.phase,
                "Exiting with undelivered samples"
            );
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    handle.shutdown().await;
    Ok(())
}

async fn run_stats(config: SessionConfig, user: &str) -> Result<()> {
    let transport = Arc::new(HttpTransport::new(&config).context("Failed to build HTTP transport")?);
    let client = StatisticsClient::new(transport);

    let stats = client
        .fetch_statistics(user)
        .await
        .with_context(|| format!("Failed to fetch statistics for '{user}'"))?;

    println!();
    println!("  User:            {}", stats.user_id);
    println!("  Locations:       {}", stats.total_locations);
    println!("  Distance:        {:.1} km", stats.distance_traveled_km());
    if let (Some(first), Some(last)) = (stats.first_location_timestamp, stats.last_location_timestamp) {
        let fmt = |ms: i64| {
            chrono::DateTime::from_timestamp_millis(ms)
                .map_or_else(|| ms.to_string(), |t| t.to_rfc3339())
        };
        println!("  First / last:    {} / {}", fmt(first), fmt(last));
    }
    if let Some((hour, count)) = stats.busiest_hour() {
        println!("  Busiest hour:    {hour:02}:00 ({count} samples)");
    }
    if let Some((city, count)) = stats.top_city() {
        println!("  Top city:        {city} ({count} visits)");
    }
    println!("  Common stops:    {}", stats.common_stops.len());
    for stop in &stats.common_stops {
        println!(
            "    - {:<24} ({:.5}, {:.5})  visits={}  avg={:.0} min",
            stop.name.as_deref().unwrap_or("unnamed"),
            stop.latitude,
            stop.longitude,
            stop.visit_count,
            stop.average_duration_minutes
        );
    }
    println!();

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let mut config = resolve_config(&args)?;

    match &args.command {
        SubCommand::Track {
            user,
            interval_ms,
            drain_secs,
        } => {
            if let Some(ms) = interval_ms {
                config.interval_ms = *ms;
                config.validate().context("Invalid --interval-ms")?;
            }
            run_track(config, user, *drain_secs).await
        }
        SubCommand::Stats { user } => run_stats(config, user).await,
    }
}

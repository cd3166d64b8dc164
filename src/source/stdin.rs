//! JSON-lines fix feed.
//!
//! Reads one [`RawFix`] JSON object per line and pushes it into a
//! [`FixFeeder`]. Used by the CLI with stdin:
//! `replay_fixes.py | location-analytics track`

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use super::FixFeeder;
use crate::types::RawFix;

/// Feed fixes from `reader` until EOF. Returns the number of fixes parsed.
///
/// Blank lines are skipped; malformed lines are logged and skipped.
pub async fn feed_json_lines<R>(reader: R, feeder: &FixFeeder) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut parsed = 0usize;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RawFix>(line) {
            Ok(fix) => {
                parsed += 1;
                if !feeder.push(fix) {
                    debug!("Fix read while not subscribed - kept as last known fix only");
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse fix line");
            }
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChannelFixSource, FixQuery, FixSource};

    #[tokio::test]
    async fn test_feeds_valid_lines_and_skips_bad_ones() {
        let input = concat!(
            r#"{"latitude": 1.0, "longitude": 2.0, "accuracy_meters": 5.0, "captured_at_millis": 10}"#,
            "\n\n",
            "not json\n",
            r#"{"latitude": 3.0, "longitude": 4.0, "accuracy_meters": 5.0, "captured_at_millis": 20}"#,
            "\n",
        );
        let (source, feeder) = ChannelFixSource::new();

        let parsed = feed_json_lines(input.as_bytes(), &feeder).await.unwrap();
        assert_eq!(parsed, 2);

        let last = source.fix_query().current_fix().await.unwrap().unwrap();
        assert_eq!(last.captured_at_millis, 20);
    }
}

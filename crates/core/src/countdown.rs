//! Remaining-time arithmetic and display formatting for timed attempts.

use chrono::{DateTime, Utc};

/// Whole seconds left until `deadline`, clamped at zero.
///
/// Floors partial seconds so the display never shows more time than is
/// actually left.
#[must_use]
pub fn remaining_seconds(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = deadline.signed_duration_since(now).num_milliseconds();
    u64::try_from(millis / 1000).unwrap_or(0)
}

/// Formats a second count as `minutes:seconds`, seconds zero-padded.
#[must_use]
pub fn format_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

//! Humanized elapsed-time formatting for console display.
//!
//! Breaks a duration down into calendar-ish units (years, months, days,
//! hours, minutes, seconds) and renders only the non-zero ones, e.g.
//! `10m 33s` or `1d 2h 5s`. Months and years use fixed 30/365-day
//! approximations; this is display glue, not calendar arithmetic.

use std::time::Duration;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;
const SECS_PER_MONTH: u64 = 30 * SECS_PER_DAY;
const SECS_PER_YEAR: u64 = 365 * SECS_PER_DAY;

/// Format a duration as non-zero units down to whole seconds.
///
/// Sub-second precision is dropped. A zero (or sub-second) duration
/// renders as `"0s"`.
pub fn humanize(duration: Duration) -> String {
    let mut secs = duration.as_secs();

    let units = [
        (SECS_PER_YEAR, "y"),
        (SECS_PER_MONTH, "mo"),
        (SECS_PER_DAY, "d"),
        (SECS_PER_HOUR, "h"),
        (SECS_PER_MINUTE, "m"),
        (1, "s"),
    ];

    let mut parts = Vec::new();
    for (unit_secs, suffix) in units {
        let count = secs / unit_secs;
        if count > 0 {
            parts.push(format!("{}{}", count, suffix));
            secs -= count * unit_secs;
        }
    }

    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

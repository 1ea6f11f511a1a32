// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable ages for backups and journal entries.

use chrono::{DateTime, Utc};

/// Format seconds as a short duration: `"5s"`, `"2m"`, `"1h30m"`, `"3d"`.
pub fn format_elapsed(secs: u64) -> String {
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m", secs / 60),
        3600..=86399 => {
            let (h, m) = (secs / 3600, (secs % 3600) / 60);
            if m == 0 {
                format!("{}h", h)
            } else {
                format!("{}h{}m", h, m)
            }
        }
        _ => format!("{}d", secs / 86400),
    }
}

/// Age of `then` relative to `now`, e.g. `"3d ago"`.
///
/// Timestamps in the future (clock skew between machines) render as `"just now"`.
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    if secs <= 0 {
        return "just now".to_string();
    }
    format!("{} ago", format_elapsed(secs as u64))
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;

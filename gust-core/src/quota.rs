//! Local view of the API server's rate limit.
//!
//! The server reports its quota on every response through three headers.
//! [`QuotaSnapshot::update_from_headers`] folds them into the last known
//! state, and [`QuotaLevel`] turns that state into the escalation the CLI
//! shows to the user.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// At or below this many remaining calls the quota is in [`QuotaLevel::Warning`].
pub const WARNING_THRESHOLD: i64 = 5;

/// Last known quota state reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    /// Calls allowed per window; `0` means the server has not told us yet.
    pub limit: u64,
    pub remaining: i64,
    pub reset_at: Option<DateTime<Utc>>,
}

/// How close the caller is to running out of quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuotaLevel {
    Exhausted,
    Warning,
    Normal,
}

impl QuotaLevel {
    pub fn from_remaining(remaining: i64) -> Self {
        if remaining <= 0 {
            QuotaLevel::Exhausted
        } else if remaining <= WARNING_THRESHOLD {
            QuotaLevel::Warning
        } else {
            QuotaLevel::Normal
        }
    }
}

impl QuotaSnapshot {
    /// Fold the rate-limit headers of one response into the snapshot.
    ///
    /// Absent headers leave their field untouched. An unparsable remaining
    /// count becomes `0`, and an unparsable reset time becomes one hour
    /// after `now`.
    pub fn update_from_headers(&mut self, headers: &HeaderMap, now: DateTime<Utc>) {
        if let Some(limit) = header_str(headers, LIMIT_HEADER) {
            if let Ok(limit) = limit.trim().parse::<u64>() {
                self.limit = limit;
            }
        }

        if let Some(remaining) = header_str(headers, REMAINING_HEADER) {
            self.remaining = remaining.trim().parse::<i64>().unwrap_or(0);
        }

        if let Some(reset) = header_str(headers, RESET_HEADER) {
            self.reset_at = Some(
                DateTime::parse_from_rfc3339(reset.trim())
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| now + ChronoDuration::hours(1)),
            );
        }
    }

    pub fn level(&self) -> QuotaLevel {
        QuotaLevel::from_remaining(self.remaining)
    }

    /// Whether the server has ever reported a limit.
    pub fn is_known(&self) -> bool {
        self.limit > 0
    }
}

/// A header counts as present only when it is non-empty, valid text.
/// Non-UTF-8 bytes are treated as present but unparsable.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let value = headers.get(name)?;
    let text = value.to_str().unwrap_or("\u{fffd}");
    if text.is_empty() { None } else { Some(text) }
}

fn time_until(
    reset_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<ChronoDuration> {
    let left = reset_at? - now;
    (left > ChronoDuration::zero()).then_some(left)
}

/// Minutes until `reset_at`, rounded up so "0 minutes" is never shown
/// while time is still left.
pub fn minutes_until(reset_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    time_until(reset_at, now).map(|left| left.num_minutes() + 1)
}

/// User-facing advice on when to retry after the quota ran out.
pub fn retry_hint(reset_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(minutes) = minutes_until(reset_at, now) else {
        return "rate limit reached, please try again later".to_string();
    };

    let hours = minutes / 60;
    if hours > 0 {
        format!(
            "please try again in about {} hour(s) and {} minute(s) when your rate limit resets",
            hours,
            minutes % 60
        )
    } else {
        format!("please try again in about {minutes} minute(s) when your rate limit resets")
    }
}

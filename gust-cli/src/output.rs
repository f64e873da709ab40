//! Human-facing status lines. Everything here goes to stderr so stdout
//! only ever carries data.

use chrono::{DateTime, Local, Utc};
use gust_core::{QuotaSnapshot, quota::minutes_until};

pub fn print_info(message: &str) {
    eprintln!("{message}");
}

pub fn print_success(message: &str) {
    eprintln!("✅ {message}");
}

pub fn print_rate_limit_warning(quota: &QuotaSnapshot, now: DateTime<Utc>) {
    eprintln!();
    eprintln!("⚠️  API Rate Limit Warning");
    eprintln!(
        "You have {} requests remaining out of {}.",
        quota.remaining, quota.limit
    );
    eprintln!("{}", reset_line(quota.reset_at, now));
    eprintln!();
}

pub fn print_rate_limit_error(limit: u64, reset_at: Option<DateTime<Utc>>, now: DateTime<Utc>) {
    eprintln!();
    eprintln!("❌ API Rate Limit Reached");
    eprintln!("You have used all {limit} available requests.");
    eprintln!("{}", reset_line(reset_at, now));
    eprintln!();
}

fn reset_line(reset_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match (reset_at, minutes_until(reset_at, now)) {
        (Some(at), Some(minutes)) => format!(
            "Your rate limit will reset at {} ({} minutes from now).",
            at.with_timezone(&Local).format("%H:%M"),
            minutes
        ),
        _ => "Your rate limit should reset shortly.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn reset_line_counts_minutes() {
        let now = Utc::now();
        let line = reset_line(Some(now + Duration::minutes(30)), now);
        assert!(line.contains("(31 minutes from now)"), "{line}");
    }

    #[test]
    fn reset_line_without_reset_time() {
        let now = Utc::now();
        assert_eq!(reset_line(None, now), "Your rate limit should reset shortly.");
    }
}

//! Errors returned by [`crate::QuotaClient`].

use chrono::{DateTime, Utc};
use reqwest::StatusCode;

use crate::quota;

/// The server refused the call because the quota for this window is used up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rate limit exceeded ({remaining}/{limit} requests left)")]
pub struct QuotaError {
    pub remaining: i64,
    pub limit: u64,
    pub reset_at: Option<DateTime<Utc>>,
}

impl QuotaError {
    /// Advice on when to try again, relative to `now`.
    pub fn retry_hint(&self, now: DateTime<Utc>) -> String {
        quota::retry_hint(self.reset_at, now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    Connection,
    Api,
    Decode,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to connect to API: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: StatusCode, body: String },

    #[error("failed to decode API response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::Connection(_) => ApiErrorKind::Connection,
            ApiError::Api { .. } => ApiErrorKind::Api,
            ApiError::Decode(_) => ApiErrorKind::Decode,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    QuotaExceeded(#[from] QuotaError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ClientError {
    pub fn as_quota(&self) -> Option<&QuotaError> {
        match self {
            ClientError::QuotaExceeded(err) => Some(err),
            ClientError::Api(_) => None,
        }
    }
}

/// Cut a response body down to something fit for an error message.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("not found"), "not found");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let cut = truncate_body(&body);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.trim_end_matches("...").len(), 200);
    }

    #[test]
    fn api_error_kind_and_status() {
        let err = ApiError::Api { status: StatusCode::NOT_FOUND, body: "no such city".into() };
        assert_eq!(err.kind(), ApiErrorKind::Api);
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "API error (404 Not Found): no such city");

        let decode = serde_json::from_str::<u8>("nope").unwrap_err();
        let err = ApiError::Decode(decode);
        assert_eq!(err.kind(), ApiErrorKind::Decode);
        assert_eq!(err.status(), None);
    }
}

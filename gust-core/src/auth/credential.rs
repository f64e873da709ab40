use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// API credential issued by a successful login.
///
/// Fields are read-only; logging in again yields a new value instead of
/// mutating this one. The serialized field names match the `auth.json`
/// files written by earlier releases.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    api_key: String,
    server_url: String,
    #[serde(rename = "last_auth")]
    issued_at: DateTime<Utc>,
    #[serde(rename = "github_user")]
    principal: String,
}

impl Credential {
    pub(crate) fn new(
        api_key: String,
        server_url: String,
        issued_at: DateTime<Utc>,
        principal: String,
    ) -> Self {
        Self { api_key, server_url, issued_at, principal }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Human-readable identity the key was issued to.
    pub fn principal(&self) -> &str {
        &self.principal
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &mask_key(&self.api_key))
            .field("server_url", &self.server_url)
            .field("issued_at", &self.issued_at)
            .field("principal", &self.principal)
            .finish()
    }
}

/// Mask an API key for safe display.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}***{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Credential {
        Credential::new(
            "gust_0123456789abcdef".into(),
            "https://gust.example".into(),
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            "alice".into(),
        )
    }

    #[test]
    fn serializes_with_persisted_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["api_key"], "gust_0123456789abcdef");
        assert_eq!(value["server_url"], "https://gust.example");
        assert_eq!(value["github_user"], "alice");
        assert_eq!(value["last_auth"], "2025-03-01T12:00:00Z");
    }

    #[test]
    fn loads_a_persisted_file() {
        let json = r#"{
            "api_key": "k1",
            "server_url": "https://gust.example",
            "last_auth": "2025-03-01T12:00:00.123456+01:00",
            "github_user": "bob"
        }"#;

        let cred: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(cred.api_key(), "k1");
        assert_eq!(cred.principal(), "bob");
        assert_eq!(cred.issued_at().to_rfc3339(), "2025-03-01T11:00:00.123456+00:00");
    }

    #[test]
    fn debug_masks_api_key() {
        let debug = format!("{:?}", sample());
        assert!(!debug.contains("0123456789abcdef"));
        assert!(debug.contains("gust***cdef"));
        assert!(debug.contains("alice"));
    }

    #[test]
    fn mask_key_hides_short_keys_entirely() {
        assert_eq!(mask_key("k1"), "***");
        assert_eq!(mask_key("12345678"), "***");
        assert_eq!(mask_key("123456789"), "1234***6789");
    }
}

use std::{fmt, time::Duration};

use url::Url;

/// Server used when the caller does not name one.
pub const DEFAULT_SERVER_URL: &str = "https://gust.ngrok.io";

/// Fixed loopback port the authorization server redirects back to.
pub const DEFAULT_CALLBACK_PORT: u16 = 9876;

/// How long a login waits for the browser callback.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Delay between answering the callback and closing the listener.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },

    #[error("API key must not be empty.\nHint: run `gust login` to obtain one.")]
    MissingApiKey,

    #[error("Unknown units '{0}'. Supported units: metric, imperial, standard.")]
    UnknownUnits(String),
}

/// Measurement system requested from the weather endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Units {
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Metric, Units::Imperial, Units::Standard]
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = OptionsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            "standard" => Ok(Units::Standard),
            _ => Err(OptionsError::UnknownUnits(value.to_string())),
        }
    }
}

impl std::str::FromStr for Units {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Units::try_from(s)
    }
}

/// Everything a [`crate::QuotaClient`] needs to talk to the API server.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientOptions {
    base_url: Url,
    api_key: String,
    units: Option<Units>,
}

impl ClientOptions {
    /// Validate and build client options.
    ///
    /// The base URL must be an absolute `http`/`https` URL and the API key
    /// must be non-empty.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        units: Option<Units>,
    ) -> Result<Self, OptionsError> {
        let base_url = parse_server_url(base_url)?;
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(OptionsError::MissingApiKey);
        }

        Ok(Self { base_url, api_key, units })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn units(&self) -> Option<Units> {
        self.units
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"***")
            .field("units", &self.units)
            .finish()
    }
}

/// Options for one [`crate::auth::Authenticator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorOptions {
    pub server_url: Url,
    pub callback_port: u16,
    pub timeout: Duration,
    pub shutdown_grace: Duration,
}

impl AuthenticatorOptions {
    /// Options with the documented defaults for `server_url`.
    ///
    /// An empty string selects [`DEFAULT_SERVER_URL`].
    pub fn new(server_url: &str) -> Result<Self, OptionsError> {
        let server_url = if server_url.trim().is_empty() {
            DEFAULT_SERVER_URL
        } else {
            server_url
        };

        Ok(Self {
            server_url: parse_server_url(server_url)?,
            callback_port: DEFAULT_CALLBACK_PORT,
            timeout: DEFAULT_AUTH_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        })
    }

    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

/// Parse a server origin, normalising away any trailing slash in the path.
fn parse_server_url(raw: &str) -> Result<Url, OptionsError> {
    let invalid = |reason: String| OptionsError::InvalidServerUrl {
        url: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be used as a base".to_string()));
    }

    let trimmed = url.path().trim_end_matches('/').to_string();
    url.set_path(&trimmed);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Join `segments` onto the path of `base`, percent-encoding each segment.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

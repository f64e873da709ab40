use std::{
    fmt::Debug,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    City, ClientOptions, WeatherResponse,
    config::endpoint,
    error::{ApiError, ClientError, QuotaError, truncate_body},
    quota::{QuotaLevel, QuotaSnapshot},
};

/// Anything that can answer weather and city-search queries.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn get_weather(&self, city_name: &str) -> Result<WeatherResponse, ClientError>;

    async fn search_cities(&self, query: &str) -> Result<Vec<City>, ClientError>;
}

/// HTTP client for the gust API server that keeps track of the server's
/// rate limit.
///
/// Every response, whatever its status, refreshes the [`QuotaSnapshot`].
/// The client never retries or sleeps; callers read [`QuotaClient::quota`]
/// and decide for themselves.
#[derive(Debug)]
pub struct QuotaClient {
    options: ClientOptions,
    http: Client,
    quota: Mutex<QuotaSnapshot>,
}

impl QuotaClient {
    pub fn new(options: ClientOptions) -> Self {
        Self::with_http_client(options, Client::new())
    }

    pub fn with_http_client(options: ClientOptions, http: Client) -> Self {
        Self {
            options,
            http,
            quota: Mutex::new(QuotaSnapshot::default()),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Copy of the last known quota state.
    pub fn quota(&self) -> QuotaSnapshot {
        *self.quota.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn quota_level(&self) -> QuotaLevel {
        self.quota().level()
    }

    async fn fetch_weather(&self, city_name: &str) -> Result<WeatherResponse, ClientError> {
        let url = endpoint(self.options.base_url(), &["api", "weather", city_name]);

        let mut query = vec![("api_key", self.options.api_key())];
        if let Some(units) = self.options.units() {
            query.push(("units", units.as_str()));
        }

        let res = self
            .http
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(ApiError::Connection)?;

        self.read_json(res).await
    }

    async fn fetch_cities(&self, query: &str) -> Result<Vec<City>, ClientError> {
        let url = endpoint(self.options.base_url(), &["api", "cities", "search"]);

        let res = self
            .http
            .get(url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(ApiError::Connection)?;

        self.read_json(res).await
    }

    /// Record quota headers, then classify the status and decode the body.
    async fn read_json<T: DeserializeOwned>(&self, res: Response) -> Result<T, ClientError> {
        let snapshot = self.record_quota(&res);
        let status = res.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(QuotaError {
                remaining: 0,
                limit: snapshot.limit,
                reset_at: snapshot.reset_at,
            }
            .into());
        }

        let body = res.text().await.map_err(ApiError::Connection)?;

        if !status.is_success() {
            return Err(ApiError::Api { status, body: truncate_body(&body) }.into());
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e).into())
    }

    fn record_quota(&self, res: &Response) -> QuotaSnapshot {
        let mut quota = self.quota.lock().unwrap_or_else(PoisonError::into_inner);
        quota.update_from_headers(res.headers(), Utc::now());

        if quota.is_known() {
            debug!(
                remaining = quota.remaining,
                limit = quota.limit,
                reset_at = ?quota.reset_at,
                "rate limit updated"
            );
        }

        *quota
    }
}

#[async_trait]
impl WeatherSource for QuotaClient {
    async fn get_weather(&self, city_name: &str) -> Result<WeatherResponse, ClientError> {
        self.fetch_weather(city_name).await
    }

    async fn search_cities(&self, query: &str) -> Result<Vec<City>, ClientError> {
        self.fetch_cities(query).await
    }
}

//! Calls to the authorization server's login endpoints.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::error::AuthError;
use crate::{config::endpoint, error::truncate_body};

const AUTH_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct AuthUrlResponse {
    url: String,
}

#[derive(Debug, Serialize)]
struct ExchangeRequest<'a> {
    code: &'a str,
    callback_port: u16,
}

/// Key issued in exchange for an authorization code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExchangeResponse {
    pub api_key: String,
    pub github_user: String,
}

#[derive(Debug, Clone)]
pub struct AuthServer {
    base_url: Url,
    http: Client,
    request_timeout: Duration,
}

impl AuthServer {
    pub fn new(base_url: Url) -> Self {
        Self { base_url, http: Client::new(), request_timeout: AUTH_HTTP_TIMEOUT }
    }

    /// Per-request timeout for both login calls (30 seconds by default).
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /api/auth/request?callback_port={port}`: where to send the browser.
    pub async fn request_auth_url(&self, callback_port: u16) -> Result<String, AuthError> {
        let url = endpoint(&self.base_url, &["api", "auth", "request"]);

        let res = self
            .http
            .get(url)
            .query(&[("callback_port", callback_port)])
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| AuthError::AuthUrlRequestFailed(format!("failed to contact auth server: {e}")))?;

        let status = res.status();
        if status != StatusCode::OK {
            return Err(AuthError::AuthUrlRequestFailed(format!(
                "server returned status code {}",
                status.as_u16()
            )));
        }

        let body: AuthUrlResponse = res
            .json()
            .await
            .map_err(|e| AuthError::AuthUrlRequestFailed(format!("failed to decode response: {e}")))?;

        Ok(body.url)
    }

    /// `POST /api/auth/exchange`: trade the callback code for an API key.
    pub async fn exchange_code(
        &self,
        code: &str,
        callback_port: u16,
    ) -> Result<ExchangeResponse, AuthError> {
        let url = endpoint(&self.base_url, &["api", "auth", "exchange"]);

        let res = self
            .http
            .post(url)
            .json(&ExchangeRequest { code, callback_port })
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| AuthError::CodeExchangeFailed(format!("failed to exchange code: {e}")))?;

        let status = res.status();
        if status != StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            return Err(AuthError::CodeExchangeFailed(format!(
                "server returned status {}: {}",
                status.as_u16(),
                truncate_body(&body)
            )));
        }

        res.json()
            .await
            .map_err(|e| AuthError::CodeExchangeFailed(format!("failed to decode response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path, query_param},
    };

    fn server_for(mock: &MockServer) -> AuthServer {
        AuthServer::new(Url::parse(&mock.uri()).unwrap())
    }

    #[tokio::test]
    async fn request_auth_url_passes_callback_port() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/request"))
            .and(query_param("callback_port", "9876"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"url": "http://example/authorize"})),
            )
            .expect(1)
            .mount(&mock)
            .await;

        let url = server_for(&mock).request_auth_url(9876).await.unwrap();
        assert_eq!(url, "http://example/authorize");
    }

    #[tokio::test]
    async fn request_auth_url_rejects_non_ok_status() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock)
            .await;

        let err = server_for(&mock).request_auth_url(9876).await.unwrap_err();
        assert!(matches!(err, AuthError::AuthUrlRequestFailed(ref msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn slow_auth_server_hits_request_timeout() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"url": "http://example/authorize"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock)
            .await;

        let server = server_for(&mock).with_request_timeout(Duration::from_millis(100));
        let err = server.request_auth_url(9876).await.unwrap_err();
        assert!(
            matches!(err, AuthError::AuthUrlRequestFailed(ref msg) if msg.contains("failed to contact auth server")),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn exchange_code_posts_code_and_port() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/exchange"))
            .and(body_json(json!({"code": "abc", "callback_port": 9876})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"api_key": "k1", "github_user": "alice"})),
            )
            .expect(1)
            .mount(&mock)
            .await;

        let issued = server_for(&mock).exchange_code("abc", 9876).await.unwrap();
        assert_eq!(
            issued,
            ExchangeResponse { api_key: "k1".into(), github_user: "alice".into() }
        );
    }

    #[tokio::test]
    async fn exchange_code_surfaces_error_body() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("code expired"))
            .mount(&mock)
            .await;

        let err = server_for(&mock).exchange_code("abc", 9876).await.unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, AuthError::CodeExchangeFailed(_)));
        assert!(msg.contains("401"));
        assert!(msg.contains("code expired"));
    }
}

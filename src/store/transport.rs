//! HTTP seam between the retrying client and the network.
use async_trait::async_trait;
use reqwest::{
    Client, Method, StatusCode, Url,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::error::{Outcome, StoreError};

/// Media type requested from the GitHub REST API.
pub const GITHUB_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// A fully described outbound request. Cloned once per attempt.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Build an authenticated request for the GitHub API.
    pub fn new(method: Method, url: Url, token: &SecretString) -> Outcome<Self> {
        let mut headers = HeaderMap::new();

        let mut token_value =
            HeaderValue::from_str(&format!("token {}", token.expose_secret()))?;
        token_value.set_sensitive(true);

        headers.insert(AUTHORIZATION, token_value);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ghstore/", env!("CARGO_PKG_VERSION"))),
        );

        Ok(Self {
            method,
            url,
            headers,
            body: None,
        })
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Path and query, for log lines that must not leak credentials.
    pub fn describe(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{} {}?{}", self.method, self.url.path(), query),
            None => format!("{} {}", self.method, self.url.path()),
        }
    }
}

/// What came back from the server, whatever the status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The request never produced a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connection(String),
}

impl From<TransportError> for StoreError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(msg) => StoreError::Timeout(msg),
            TransportError::Connection(msg) => StoreError::ConnectionError(msg),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

/// Performs a single HTTP exchange. Implementations must not retry.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: ApiRequest,
    ) -> std::result::Result<ApiResponse, TransportError>;
}

/// [`Transport`] backed by a reqwest client with a per-call timeout.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Outcome<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                StoreError::unexpected(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: ApiRequest,
    ) -> std::result::Result<ApiResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> SecretString {
        SecretString::from("ghp_secret".to_string())
    }

    #[test]
    fn requests_carry_github_headers() {
        let url = Url::parse("https://api.github.com/rate_limit").unwrap();
        let request = ApiRequest::new(Method::GET, url, &token()).unwrap();

        assert_eq!(request.headers[AUTHORIZATION], "token ghp_secret");
        assert!(request.headers[AUTHORIZATION].is_sensitive());
        assert_eq!(request.headers[ACCEPT], GITHUB_MEDIA_TYPE);
        assert!(
            request.headers[USER_AGENT]
                .to_str()
                .unwrap()
                .starts_with("ghstore/")
        );
        assert!(request.body.is_none());
    }

    #[test]
    fn describe_omits_credentials() {
        let url = Url::parse(
            "https://api.github.com/repos/octo/blog/contents?ref=main",
        )
        .unwrap();
        let request = ApiRequest::new(Method::GET, url, &token()).unwrap();
        let line = request.describe();
        assert_eq!(line, "GET /repos/octo/blog/contents?ref=main");
        assert!(!line.contains("ghp_secret"));
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let url = Url::parse("https://api.github.com/rate_limit").unwrap();
        let bad = SecretString::from("ghp\nsecret".to_string());

        let err = ApiRequest::new(Method::GET, url, &bad).unwrap_err();

        assert_eq!(err.kind(), crate::error::FailureKind::UnexpectedError);
        assert!(err.message().contains("malformed token"));
    }

    #[test]
    fn transport_errors_map_to_failure_kinds() {
        let err: StoreError = TransportError::Timeout("30s".into()).into();
        assert!(matches!(err, StoreError::Timeout(_)));
        let err: StoreError = TransportError::Connection("refused".into()).into();
        assert!(matches!(err, StoreError::ConnectionError(_)));
    }
}

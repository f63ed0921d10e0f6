//! HTTP transport seam.

use crate::{FetchError, FetchResult};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// A request relative to the backend base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path beginning with `/`, e.g. `/v1/malls`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A 2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Decode the body. A payload that does not match `T` is fatal.
    pub fn json<T: DeserializeOwned>(&self) -> FetchResult<T> {
        serde_json::from_str(&self.body).map_err(|e| FetchError::Fatal {
            status: Some(self.status),
            message: format!("Unexpected response payload: {}", e),
        })
    }
}

/// Why an attempt did not produce a 2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// Nothing came back: connect failure, timeout, reset.
    NoResponse { reason: String },
    /// The server answered with a non-2xx status.
    Http { status: u16, body: String },
}

/// Sends one attempt of a request with the given bearer token.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &ApiRequest, bearer: &str) -> Result<ApiResponse, TransportFailure>;
}

/// reqwest implementation of [`HttpTransport`].
#[derive(Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    api_url: String,
}

impl ReqwestTransport {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> FetchResult<Self> {
        let api_url: String = api_url.into();
        url::Url::parse(&api_url)?;

        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.api_url, path)
        } else {
            format!("{}/{}", self.api_url, path)
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest, bearer: &str) -> Result<ApiResponse, TransportFailure> {
        let url = self.url_for(&request.path);
        debug!(method = %request.method, url = %url, "Dispatching request");

        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .bearer_auth(bearer)
            .header(reqwest::header::ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| TransportFailure::NoResponse {
            reason: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportFailure::NoResponse {
                reason: format!("Response body interrupted: {}", e),
            })?;

        if (200..300).contains(&status) {
            Ok(ApiResponse { status, body })
        } else {
            Err(TransportFailure::Http { status, body })
        }
    }
}

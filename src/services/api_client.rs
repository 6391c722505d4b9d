use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::errors::{CheckoutError, TransportError};

/// Raw response from the merchant backend. Clients decide how to read the body
/// since success and error payloads have different shapes.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Non-empty `message` field of a JSON body
    pub fn message(&self) -> Option<String> {
        message_field(&self.body)
    }
}

#[derive(Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

fn message_field(body: &str) -> Option<String> {
    serde_json::from_str::<MessageBody>(body)
        .ok()
        .and_then(|body| body.message)
        .filter(|msg| !msg.is_empty())
}

/// Thin wrapper over `reqwest` for the merchant backend: base URL, default
/// timeout, bearer auth and request/response logging.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    default_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, default_timeout: Duration) -> Result<Self, CheckoutError> {
        let client = reqwest::Client::builder()
            .timeout(default_timeout)
            .build()
            .map_err(|e| CheckoutError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(
        &self,
        path: &str,
        token: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<ApiResponse, TransportError> {
        self.send::<()>(Method::GET, path, None, token, timeout, &[])
            .await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
        timeout: Option<Duration>,
        headers: &[(&str, &str)],
    ) -> Result<ApiResponse, TransportError> {
        self.send(Method::POST, path, Some(body), token, timeout, headers)
            .await
    }

    #[instrument(skip(self, body, token, headers), fields(url))]
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
        timeout: Option<Duration>,
        headers: &[(&str, &str)],
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url(path);
        let timeout = timeout.unwrap_or(self.default_timeout);
        tracing::Span::current().record("url", url.as_str());
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .timeout(timeout)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!("{} {} timed out after {:?}", method, url, timeout);
                TransportError::Timeout(timeout)
            } else {
                error!("{} {} failed: {}", method, url, e);
                TransportError::from(e)
            }
        })?;

        let status = response.status();
        debug!("{} {} -> {}", method, url, status);

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            warn!("{} {} rejected the session token", method, url);
            return Err(TransportError::Unauthorized(message_field(&body)));
        }
        if !status.is_success() {
            warn!("{} {} returned {}: {}", method, url, status, body);
        }

        Ok(ApiResponse { status, body })
    }
}

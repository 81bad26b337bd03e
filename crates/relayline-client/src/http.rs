//! HTTP request channel.

use std::time::Duration;

use async_trait::async_trait;
use relayline_proto::{ErrorBody, SendRequest, SendResponse, StartRequest, StartResponse};
use serde::{Serialize, de::DeserializeOwned};

use crate::backend::{Backend, BackendError};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP backend configuration
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Base URL; `start` and `send` are resolved against it
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_API_URL.to_owned(), timeout: DEFAULT_REQUEST_TIMEOUT }
    }
}

/// [`Backend`] over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a backend.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unreachable` if the HTTP client cannot be
    /// initialized.
    pub fn new(config: &HttpBackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_owned() })
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, BackendError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| BackendError::Unreachable(e.to_string()))?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => body.detail(),
                Err(_) if text.trim().is_empty() => status.to_string(),
                Err(_) => text,
            };
            return Err(BackendError::Rejected { status: status.as_u16(), detail });
        }

        let body = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(body).map_err(|e| BackendError::InvalidBody(e.to_string()))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn start(&self, request: StartRequest) -> Result<StartResponse, BackendError> {
        self.post("start", &request).await
    }

    async fn send(&self, request: SendRequest) -> Result<SendResponse, BackendError> {
        self.post("send", &request).await
    }
}

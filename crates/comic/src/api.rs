//! REST client for the comic-generation endpoint.
//!
//! Forwards the caller's JSON payload byte for byte with a single `POST`
//! and checks that the response body is JSON without re-encoding it,
//! using [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::value::RawValue;

use crate::ComicGenerator;

/// HTTP client for one comic service endpoint.
#[derive(Debug, Clone)]
pub struct ComicApi {
    client: reqwest::Client,
    api_url: String,
    timeout: Duration,
}

/// Errors from the comic service REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ComicApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// No complete response arrived within the configured timeout.
    #[error("Comic service did not respond within {0:?}")]
    Timeout(Duration),

    /// The service returned a non-2xx status code.
    #[error("Comic service error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response whose body is not valid JSON.
    #[error("Comic service returned an unparseable body: {0}")]
    Decode(String),
}

impl ComicApiError {
    /// Whether a retry has a reasonable chance of succeeding.
    ///
    /// Transport failures, timeouts and 5xx responses are transient.
    /// 4xx responses and undecodable bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ComicApiError::Request(_) | ComicApiError::Timeout(_) => true,
            ComicApiError::ApiError { status, .. } => *status >= 500,
            ComicApiError::Decode(_) => false,
        }
    }
}

impl ComicApi {
    /// Create a client for the service at `api_url`.
    ///
    /// * `timeout` - hard limit for one request, from connect until the
    ///   whole body has been read.
    pub fn new(api_url: String, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, timeout)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String, timeout: Duration) -> Self {
        Self {
            client,
            api_url,
            timeout,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Post `payload` and return the response body as received.
    pub async fn submit(&self, payload: &RawValue) -> Result<Box<RawValue>, ComicApiError> {
        let response = self
            .client
            .post(&self.api_url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .body(payload.get().to_owned())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(ComicApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        RawValue::from_string(body).map_err(|e| ComicApiError::Decode(e.to_string()))
    }

    fn classify(&self, err: reqwest::Error) -> ComicApiError {
        if err.is_timeout() {
            ComicApiError::Timeout(self.timeout)
        } else {
            ComicApiError::Request(err)
        }
    }
}

#[async_trait]
impl ComicGenerator for ComicApi {
    async fn generate(&self, payload: &RawValue) -> Result<Box<RawValue>, ComicApiError> {
        self.submit(payload).await
    }
}

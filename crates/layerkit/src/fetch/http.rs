//! HTTP client abstraction for testability.

use crate::config::FetchConfig;
use crate::error::FetchError;
use futures::future::BoxFuture;
use std::time::Duration;
use tracing::trace;

/// Minimal asynchronous HTTP GET.
///
/// Fetchers depend on this trait rather than on `reqwest` so tests can
/// serve canned bodies.
pub trait HttpClient: Send + Sync {
    /// Returns the response body, or [`FetchError::Status`] for a non-2xx
    /// response.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            trace!(url, "GET");
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;
            trace!(url, bytes = body.len(), "response");
            Ok(body.to_vec())
        })
    }
}

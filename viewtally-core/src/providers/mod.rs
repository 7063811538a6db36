//! Provider clients for view and play statistics.
//!
//! Clients talk to their APIs through [`HttpTransport`], so the same
//! batching and pagination code runs against the network in production and
//! against scripted responses in tests.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{Provider, Result, ViewTallyError};

pub mod vimeo;
pub mod youtube;

#[cfg(any(test, feature = "test-utils"))]
pub mod scripted;

#[cfg(any(test, feature = "test-utils"))]
pub use scripted::ScriptedTransport;
pub use vimeo::VimeoClient;
pub use youtube::YouTubeClient;

/// Summed statistics for one provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderTotal {
    /// Summed view or play count
    pub views: u64,
    /// Number of identifiers that were queried
    pub videos: usize,
}

/// An outbound GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: Url,
    /// Sent as `Authorization: Bearer <token>` when present
    pub bearer_token: Option<String>,
}

impl ApiRequest {
    pub fn get(url: Url) -> Self {
        Self {
            url,
            bearer_token: None,
        }
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

/// Raw response as seen by a provider client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures below the HTTP status level.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("request failed: {reason}")]
    Connection { reason: String },
}

/// Issues HTTP GET requests on behalf of provider clients.
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    /// Sends a GET request and returns the status and body.
    ///
    /// # Errors
    /// - `TransportError::Timeout` - No response within the configured timeout
    /// - `TransportError::Connection` - Connection, TLS or body read failure
    async fn get(
        &self,
        request: ApiRequest,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// - `ViewTallyError::Configuration` - If the HTTP client cannot be built
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ViewTallyError::Configuration {
                reason: format!("HTTP client setup failed: {e}"),
            })?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        request: ApiRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let mut builder = self.client.get(request.url);
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_error(e))?;

        Ok(TransportResponse { status, body })
    }
}

impl ReqwestTransport {
    fn map_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Connection {
                reason: error.to_string(),
            }
        }
    }
}

/// Sends `request` and decodes a successful JSON body.
///
/// Any transport failure, non-success status or unexpected body becomes
/// `ViewTallyError::Upstream` for `provider`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    transport: &dyn HttpTransport,
    provider: Provider,
    request: ApiRequest,
) -> Result<T> {
    let response = transport
        .get(request)
        .await
        .map_err(|e| ViewTallyError::Upstream {
            provider,
            status: None,
            message: e.to_string(),
        })?;

    if !response.is_success() {
        return Err(ViewTallyError::Upstream {
            provider,
            status: Some(response.status),
            message: truncate_body(&response.body),
        });
    }

    serde_json::from_str(&response.body).map_err(|e| ViewTallyError::Upstream {
        provider,
        status: Some(response.status),
        message: format!("unexpected response body: {e}"),
    })
}

/// A statistics counter as providers encode it.
///
/// YouTube sends counts as decimal strings, Vimeo as numbers. Anything else
/// (negative or fractional numbers, objects) lands in `Other`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum CountValue {
    Number(u64),
    Text(String),
    Other(serde_json::Value),
}

impl CountValue {
    /// The count, or `None` when the value is not a non-negative integer.
    pub(crate) fn as_count(&self) -> Option<u64> {
        match self {
            CountValue::Number(n) => Some(*n),
            CountValue::Text(text) => text.trim().parse().ok(),
            CountValue::Other(_) => None,
        }
    }
}

/// Adds a possibly missing counter to `total`.
///
/// A missing counter contributes zero. An unreadable one also contributes
/// zero and is logged, since one bad item must not void the whole sum.
pub(crate) fn add_count(
    total: u64,
    count: Option<&CountValue>,
    provider: Provider,
    id: &str,
) -> u64 {
    match count {
        None => total,
        Some(value) => match value.as_count() {
            Some(n) => total.saturating_add(n),
            None => {
                tracing::warn!("Ignoring unreadable {provider} count {value:?} for {id}");
                total
            }
        },
    }
}

/// Upper bound on how much of an error body is folded into messages.
const MAX_ERROR_BODY_CHARS: usize = 512;

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        let truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{truncated}...")
    }
}

/// Resolves `path` relative to an API base URL, keeping any base path.
pub(crate) fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    let joined = format!("{}/{}", base_url.trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| ViewTallyError::Configuration {
        reason: format!("invalid API base URL '{base_url}': {e}"),
    })
}

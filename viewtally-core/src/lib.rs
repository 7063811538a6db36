//! Viewtally Core - View-count aggregation for a video portfolio
//!
//! This crate provides the building blocks behind the view-count endpoint:
//! identifier extraction from the site's content corpus, provider clients
//! for the YouTube Data API and the Vimeo API, and the aggregator that
//! composes both into one summary.

pub mod aggregate;
pub mod config;
pub mod extraction;
pub mod providers;
pub mod tracing_setup;

use std::fmt;

// Re-export main types for convenient access
pub use aggregate::{ViewCountAggregator, ViewCountSummary};
pub use config::{FailurePolicy, ViewTallyConfig};
pub use extraction::{IdentifierExtractor, IdentifierSet, select_extractor};
pub use providers::{HttpTransport, ProviderTotal, ReqwestTransport};

/// Upstream video-hosting providers that contribute to the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    YouTube,
    Vimeo,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::YouTube => write!(f, "YouTube"),
            Provider::Vimeo => write!(f, "Vimeo"),
        }
    }
}

/// Errors that abort a view-count request.
///
/// Every variant is fatal for the invocation that produced it; nothing is
/// retried or recovered below the request handler.
#[derive(Debug, thiserror::Error)]
pub enum ViewTallyError {
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Content corpus unavailable: {reason}")]
    CorpusUnavailable { reason: String },

    #[error("{provider} API error{}: {message}", format_status(.status))]
    Upstream {
        provider: Provider,
        /// HTTP status, absent when no response arrived
        status: Option<u16>,
        message: String,
    },
}

impl ViewTallyError {
    /// Builds the error raised when no provider credential is configured.
    pub fn missing_credentials() -> Self {
        const REASON: &str = "Missing credentials. Set YOUTUBE_API_KEY and/or VIMEO_ACCESS_TOKEN";
        ViewTallyError::Configuration {
            reason: REASON.to_string(),
        }
    }

    /// Checks if this error came from an upstream provider call.
    pub fn is_upstream(&self) -> bool {
        matches!(self, ViewTallyError::Upstream { .. })
    }
}

pub type Result<T> = std::result::Result<T, ViewTallyError>;

fn format_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

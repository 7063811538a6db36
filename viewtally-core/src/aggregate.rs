//! View-count aggregation across providers.
//!
//! One call to [`ViewCountAggregator::aggregate`] extracts identifiers from
//! the corpus, queries both providers concurrently and folds the subtotals
//! into a [`ViewCountSummary`]. No state survives between calls.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::config::{AggregationConfig, FailurePolicy, ViewTallyConfig};
use crate::extraction::{IdentifierExtractor, IdentifierSet, select_extractor};
use crate::providers::{HttpTransport, ProviderTotal, ReqwestTransport, VimeoClient, YouTubeClient};
use crate::{Provider, Result, ViewTallyError};

/// Number of identifiers processed per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierCounts {
    pub youtube_videos: usize,
    #[serde(skip_serializing_if = "is_zero")]
    pub youtube_playlists: usize,
    pub vimeo_videos: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

/// The aggregate returned to callers.
///
/// `total` always equals `youtube + vimeo + offset`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewCountSummary {
    pub total: u64,
    pub youtube: u64,
    pub vimeo: u64,
    pub counts: IdentifierCounts,
    #[serde(serialize_with = "serialize_timestamp")]
    pub updated_at: DateTime<Utc>,
    /// Providers that failed under [`FailurePolicy::Degrade`]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_providers: Vec<Provider>,
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Composes extraction and the provider clients for one request.
#[derive(Debug)]
pub struct ViewCountAggregator {
    extractor: Box<dyn IdentifierExtractor>,
    youtube: Option<YouTubeClient>,
    vimeo: Option<VimeoClient>,
    has_credentials: bool,
    aggregation: AggregationConfig,
}

impl ViewCountAggregator {
    /// Creates an aggregator over an explicit extractor and transport.
    ///
    /// A provider client is built only when its credential is configured.
    pub fn new(
        config: &ViewTallyConfig,
        extractor: Box<dyn IdentifierExtractor>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let youtube = config
            .youtube
            .api_key
            .as_ref()
            .map(|key| YouTubeClient::new(transport.clone(), key.as_str(), &config.youtube));
        let vimeo = config
            .vimeo
            .access_token
            .as_ref()
            .map(|token| VimeoClient::new(transport.clone(), token.as_str(), &config.vimeo));

        Self {
            extractor,
            youtube,
            vimeo,
            has_credentials: config.has_any_credential(),
            aggregation: config.aggregation.clone(),
        }
    }

    /// Creates the production aggregator: corpus strategy selection plus a
    /// reqwest transport with the configured timeout.
    ///
    /// # Errors
    ///
    /// - `ViewTallyError::Configuration` - If the HTTP client cannot be built
    pub fn from_config(config: &ViewTallyConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(
            config.aggregation.request_timeout,
            config.aggregation.user_agent,
        )?;
        Ok(Self::new(
            config,
            select_extractor(&config.corpus),
            Arc::new(transport),
        ))
    }

    /// Providers whose credentials are present.
    pub fn configured_providers(&self) -> Vec<Provider> {
        let mut providers = Vec::new();
        if self.youtube.is_some() {
            providers.push(Provider::YouTube);
        }
        if self.vimeo.is_some() {
            providers.push(Provider::Vimeo);
        }
        providers
    }

    /// Extracts identifiers and merges the operator's supplementary ids.
    ///
    /// # Errors
    ///
    /// - `ViewTallyError::CorpusUnavailable` - If the corpus cannot be read
    pub async fn extract_identifiers(&self) -> Result<IdentifierSet> {
        let mut ids = self.extractor.extract().await?;
        ids.merge_supplementary(&self.aggregation.supplementary);
        Ok(ids)
    }

    /// Computes the aggregate view count.
    ///
    /// # Errors
    ///
    /// - `ViewTallyError::Configuration` - If neither provider credential is configured
    /// - `ViewTallyError::CorpusUnavailable` - If the corpus cannot be read
    /// - `ViewTallyError::Upstream` - If a provider request fails under [`FailurePolicy::FailFast`]
    pub async fn aggregate(&self) -> Result<ViewCountSummary> {
        if !self.has_credentials {
            return Err(ViewTallyError::missing_credentials());
        }

        let ids = self.extract_identifiers().await?;
        let youtube_skipped = ProviderTotal {
            views: 0,
            videos: ids.youtube_videos.len(),
        };
        let vimeo_skipped = ProviderTotal {
            views: 0,
            videos: ids.vimeo_videos.len(),
        };

        let youtube = async {
            match &self.youtube {
                Some(client) => {
                    client
                        .fetch_total(&ids.youtube_videos, &ids.youtube_playlists)
                        .await
                }
                None => {
                    tracing::debug!("YouTube credential absent, skipping provider");
                    Ok(youtube_skipped)
                }
            }
        };
        let vimeo = async {
            match &self.vimeo {
                Some(client) => client.fetch_play_total(ids.vimeo_videos.as_slice()).await,
                None => {
                    tracing::debug!("Vimeo credential absent, skipping provider");
                    Ok(vimeo_skipped)
                }
            }
        };

        let mut failed = Vec::new();
        let (youtube, vimeo) = match self.aggregation.failure_policy {
            FailurePolicy::FailFast => futures::try_join!(youtube, vimeo)?,
            FailurePolicy::Degrade => {
                let (youtube, vimeo) = futures::join!(youtube, vimeo);
                (
                    degrade(Provider::YouTube, youtube, youtube_skipped, &mut failed),
                    degrade(Provider::Vimeo, vimeo, vimeo_skipped, &mut failed),
                )
            }
        };

        let total = youtube
            .views
            .saturating_add(vimeo.views)
            .saturating_add(self.aggregation.view_offset);

        let summary = ViewCountSummary {
            total,
            youtube: youtube.views,
            vimeo: vimeo.views,
            counts: IdentifierCounts {
                youtube_videos: youtube.videos,
                youtube_playlists: ids.youtube_playlists.len(),
                vimeo_videos: vimeo.videos,
            },
            updated_at: Utc::now(),
            failed_providers: failed,
        };

        tracing::info!(
            "Aggregated {} views (youtube={}, vimeo={}, offset={}, videos={}/{})",
            summary.total,
            summary.youtube,
            summary.vimeo,
            self.aggregation.view_offset,
            summary.counts.youtube_videos,
            summary.counts.vimeo_videos
        );

        Ok(summary)
    }
}

fn degrade(
    provider: Provider,
    outcome: Result<ProviderTotal>,
    fallback: ProviderTotal,
    failed: &mut Vec<Provider>,
) -> ProviderTotal {
    match outcome {
        Ok(total) => total,
        Err(error) => {
            tracing::warn!("{provider} failed, counting it as zero: {error}");
            failed.push(provider);
            fallback
        }
    }
}

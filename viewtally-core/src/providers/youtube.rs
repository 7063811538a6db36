//! YouTube Data API v3 client.
//!
//! Video statistics are requested in chunks of at most
//! [`MAX_VIDEO_IDS_PER_REQUEST`] ids. Playlists are resolved page by page
//! through the playlist-items endpoint before statistics are requested.

use std::sync::Arc;

use serde::Deserialize;

use super::{ApiRequest, CountValue, HttpTransport, ProviderTotal, add_count, endpoint, fetch_json};
use crate::config::YouTubeConfig;
use crate::extraction::UniqueIds;
use crate::{Provider, Result};

/// Provider ceiling for ids in one `videos` request.
pub const MAX_VIDEO_IDS_PER_REQUEST: usize = 50;

/// Page size requested from the `playlistItems` endpoint.
pub const PLAYLIST_PAGE_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    statistics: Option<VideoStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    #[serde(default)]
    view_count: Option<CountValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    #[serde(default)]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentDetails {
    #[serde(default)]
    video_id: Option<String>,
}

/// Client for view statistics and playlist membership.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
    base_url: String,
    max_playlist_pages: usize,
}

impl YouTubeClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        api_key: impl Into<String>,
        config: &YouTubeConfig,
    ) -> Self {
        Self {
            transport,
            api_key: api_key.into(),
            base_url: config.base_url.clone(),
            max_playlist_pages: config.max_playlist_pages.max(1),
        }
    }

    /// Sums view counts for `video_ids`.
    ///
    /// Chunks are requested one after another. Ids the API does not return
    /// (deleted or private videos) contribute zero.
    ///
    /// # Errors
    ///
    /// - `ViewTallyError::Upstream` - If any chunk request fails; nothing is summed in that case
    pub async fn fetch_view_total(&self, video_ids: &[String]) -> Result<ProviderTotal> {
        let mut views = 0u64;
        let chunk_count = video_ids.len().div_ceil(MAX_VIDEO_IDS_PER_REQUEST);

        for (index, chunk) in video_ids.chunks(MAX_VIDEO_IDS_PER_REQUEST).enumerate() {
            let mut url = endpoint(&self.base_url, "videos")?;
            url.query_pairs_mut()
                .append_pair("part", "statistics")
                .append_pair("id", &chunk.join(","))
                .append_pair("key", &self.api_key);

            tracing::debug!(
                "Requesting YouTube statistics chunk {}/{} ({} ids)",
                index + 1,
                chunk_count,
                chunk.len()
            );
            let request = ApiRequest::get(url);
            let response: VideoListResponse =
                fetch_json(self.transport.as_ref(), Provider::YouTube, request).await?;

            for item in &response.items {
                let count = item
                    .statistics
                    .as_ref()
                    .and_then(|stats| stats.view_count.as_ref());
                views = add_count(
                    views,
                    count,
                    Provider::YouTube,
                    item.id.as_deref().unwrap_or("<unknown>"),
                );
            }
        }

        Ok(ProviderTotal {
            views,
            videos: video_ids.len(),
        })
    }

    /// Lists the video ids contained in a playlist, following continuation
    /// tokens until the last page.
    ///
    /// # Errors
    ///
    /// - `ViewTallyError::Upstream` - If any page request fails; pages already read are discarded
    pub async fn resolve_playlist(&self, playlist_id: &str) -> Result<Vec<String>> {
        let mut video_ids = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut url = endpoint(&self.base_url, "playlistItems")?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("part", "contentDetails")
                    .append_pair("maxResults", &PLAYLIST_PAGE_SIZE.to_string())
                    .append_pair("playlistId", playlist_id);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
                query.append_pair("key", &self.api_key);
            }

            let request = ApiRequest::get(url);
            let page: PlaylistItemsResponse =
                fetch_json(self.transport.as_ref(), Provider::YouTube, request).await?;
            pages += 1;

            video_ids.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| item.content_details.and_then(|d| d.video_id))
                    .filter(|id| !id.is_empty()),
            );

            page_token = page.next_page_token.filter(|token| !token.is_empty());
            if page_token.is_none() {
                break;
            }
            if pages >= self.max_playlist_pages {
                tracing::warn!(
                    "Playlist {playlist_id} still paginating after {pages} pages, stopping"
                );
                break;
            }
        }

        tracing::debug!(
            "Playlist {playlist_id} resolved to {} videos over {pages} pages",
            video_ids.len()
        );
        Ok(video_ids)
    }

    /// Unions `direct` video ids with every video in `playlists`.
    ///
    /// # Errors
    ///
    /// - `ViewTallyError::Upstream` - If any playlist cannot be resolved
    pub async fn expand_playlists(
        &self,
        direct: &UniqueIds,
        playlists: &UniqueIds,
    ) -> Result<UniqueIds> {
        let mut expanded = direct.clone();
        for playlist_id in playlists.iter() {
            let members = self.resolve_playlist(playlist_id).await?;
            expanded.extend(members);
        }
        Ok(expanded)
    }

    /// Resolves playlists, then sums views over the combined id set.
    ///
    /// # Errors
    ///
    /// - `ViewTallyError::Upstream` - If any playlist or statistics request fails
    pub async fn fetch_total(
        &self,
        videos: &UniqueIds,
        playlists: &UniqueIds,
    ) -> Result<ProviderTotal> {
        let expanded = self.expand_playlists(videos, playlists).await?;
        self.fetch_view_total(expanded.as_slice()).await
    }
}

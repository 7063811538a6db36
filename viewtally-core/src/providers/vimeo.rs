//! Vimeo API client.

use std::sync::Arc;

use serde::Deserialize;

use super::{ApiRequest, CountValue, HttpTransport, ProviderTotal, add_count, endpoint, fetch_json};
use crate::config::VimeoConfig;
use crate::{Provider, Result};

/// Provider ceiling for resource URIs in one bulk lookup.
pub const MAX_URIS_PER_REQUEST: usize = 20;

/// Fields selected from each video; everything else is left out of the response.
const SELECTED_FIELDS: &str = "uri,stats.plays";

#[derive(Debug, Deserialize)]
struct VideoPage {
    #[serde(default)]
    data: Vec<VimeoVideo>,
}

#[derive(Debug, Deserialize)]
struct VimeoVideo {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    stats: Option<VideoStats>,
}

#[derive(Debug, Deserialize)]
struct VideoStats {
    #[serde(default)]
    plays: Option<CountValue>,
}

/// Client for play statistics via the bulk `uris` lookup.
#[derive(Debug, Clone)]
pub struct VimeoClient {
    transport: Arc<dyn HttpTransport>,
    access_token: String,
    base_url: String,
}

impl VimeoClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        access_token: impl Into<String>,
        config: &VimeoConfig,
    ) -> Self {
        Self {
            transport,
            access_token: access_token.into(),
            base_url: config.base_url.clone(),
        }
    }

    /// Sums play counts for `video_ids`, at most [`MAX_URIS_PER_REQUEST`]
    /// per request, one request at a time.
    ///
    /// # Errors
    ///
    /// - `ViewTallyError::Upstream` - If any chunk request fails; nothing is summed in that case
    pub async fn fetch_play_total(&self, video_ids: &[String]) -> Result<ProviderTotal> {
        let mut plays = 0u64;
        let chunk_count = video_ids.len().div_ceil(MAX_URIS_PER_REQUEST);

        for (index, chunk) in video_ids.chunks(MAX_URIS_PER_REQUEST).enumerate() {
            let uris = chunk
                .iter()
                .map(|id| format!("/videos/{id}"))
                .collect::<Vec<_>>()
                .join(",");

            let mut url = endpoint(&self.base_url, "videos")?;
            url.query_pairs_mut()
                .append_pair("uris", &uris)
                .append_pair("fields", SELECTED_FIELDS);

            tracing::debug!(
                "Requesting Vimeo plays chunk {}/{} ({} ids)",
                index + 1,
                chunk_count,
                chunk.len()
            );
            let request = ApiRequest::get(url).with_bearer(self.access_token.as_str());
            let page: VideoPage =
                fetch_json(self.transport.as_ref(), Provider::Vimeo, request).await?;

            for video in &page.data {
                let count = video.stats.as_ref().and_then(|stats| stats.plays.as_ref());
                plays = add_count(
                    plays,
                    count,
                    Provider::Vimeo,
                    video.uri.as_deref().unwrap_or("<unknown>"),
                );
            }
        }

        Ok(ProviderTotal {
            views: plays,
            videos: video_ids.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ViewTallyError;
    use crate::providers::TransportResponse;
    use crate::providers::scripted::{ScriptedTransport, ok_json, query_param};

    fn client(transport: Arc<ScriptedTransport>) -> VimeoClient {
        VimeoClient::new(transport, "vimeo-token", &VimeoConfig::default())
    }

    fn ids(count: usize) -> Vec<String> {
        (0..count).map(|i| (100_000 + i).to_string()).collect()
    }

    #[tokio::test]
    async fn test_chunks_of_twenty_with_bearer_token() {
        let transport = Arc::new(ScriptedTransport::new(|request| {
            let uris = query_param(request, "uris").unwrap_or_default();
            let data: Vec<_> = uris
                .split(',')
                .map(|uri| json!({ "uri": uri, "stats": { "plays": 3 } }))
                .collect();
            ok_json(json!({ "data": data }))
        }));
        let video_ids = ids(45);

        let total = client(transport.clone())
            .fetch_play_total(&video_ids)
            .await
            .unwrap();
        assert_eq!(total.views, 135);
        assert_eq!(total.videos, 45);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);

        let mut seen = Vec::new();
        for request in &requests {
            assert_eq!(request.bearer_token.as_deref(), Some("vimeo-token"));
            assert_eq!(
                query_param(request, "fields").as_deref(),
                Some("uri,stats.plays")
            );
            let uris = query_param(request, "uris").unwrap();
            let chunk: Vec<String> = uris
                .split(',')
                .map(|uri| uri.trim_start_matches("/videos/").to_string())
                .collect();
            assert!(chunk.len() <= MAX_URIS_PER_REQUEST);
            seen.extend(chunk);
        }
        assert_eq!(seen, video_ids);
    }

    #[tokio::test]
    async fn test_null_and_missing_plays_contribute_zero() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            ok_json(json!({
                "data": [
                    { "uri": "/videos/1", "stats": { "plays": 10 } },
                    { "uri": "/videos/2", "stats": { "plays": null } },
                    { "uri": "/videos/3" }
                ]
            }))
        }));
        let video_ids = vec!["1".to_string(), "2".to_string(), "3".to_string()];

        let total = client(transport)
            .fetch_play_total(&video_ids)
            .await
            .unwrap();
        assert_eq!(total.views, 10);
    }

    #[tokio::test]
    async fn test_fractional_plays_do_not_fail_the_chunk() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            ok_json(json!({
                "data": [
                    { "uri": "/videos/1", "stats": { "plays": 10 } },
                    { "uri": "/videos/2", "stats": { "plays": 2.5 } },
                    { "uri": "/videos/3", "stats": { "plays": -4 } },
                    { "uri": "/videos/4", "stats": { "plays": "7" } }
                ]
            }))
        }));
        let video_ids = ids(4);

        let total = client(transport)
            .fetch_play_total(&video_ids)
            .await
            .unwrap();
        assert_eq!(total.views, 17);
        assert_eq!(total.videos, 4);
    }

    #[tokio::test]
    async fn test_empty_id_list_issues_no_request() {
        let transport = Arc::new(ScriptedTransport::new(|_| ok_json(json!({ "data": [] }))));
        let total = client(transport.clone())
            .fetch_play_total(&[])
            .await
            .unwrap();
        assert_eq!(total.views, 0);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_is_upstream_error() {
        let transport = Arc::new(ScriptedTransport::new(|_| TransportResponse {
            status: 401,
            body: r#"{"error":"Unauthorized"}"#.to_string(),
        }));

        let result = client(transport).fetch_play_total(&ids(3)).await;
        match result {
            Err(ViewTallyError::Upstream {
                provider, status, ..
            }) => {
                assert_eq!(provider, Provider::Vimeo);
                assert_eq!(status, Some(401));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }
}

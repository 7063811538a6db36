//! Shared corpus and provider fixtures.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};
use viewtally_core::ViewTallyConfig;
use viewtally_core::providers::scripted::{ScriptedTransport, ok_json, query_param};
use viewtally_core::providers::{ApiRequest, TransportResponse};

pub const YOUTUBE_HOST: &str = "www.googleapis.com";
pub const VIMEO_HOST: &str = "api.vimeo.com";

/// Config with the requested credentials and the corpus rooted in `dir`.
pub fn config_in(dir: &Path, youtube: bool, vimeo: bool) -> ViewTallyConfig {
    let mut config = ViewTallyConfig::default();
    config.corpus.records_path = Some(dir.join("projects.json"));
    config.corpus.source_text_path = Some(dir.join("projects.ts"));
    config.youtube.api_key = youtube.then(|| "yt-key".to_string());
    config.vimeo.access_token = vimeo.then(|| "vimeo-token".to_string());
    config
}

pub fn write_records(dir: &Path, records: Value) {
    std::fs::write(dir.join("projects.json"), records.to_string()).unwrap();
}

pub fn write_source_text(dir: &Path, text: &str) {
    std::fs::write(dir.join("projects.ts"), text).unwrap();
}

/// Comma-separated `id` values of a YouTube statistics request.
pub fn requested_ids(request: &ApiRequest, name: &str) -> Vec<String> {
    query_param(request, name)
        .map(|value| value.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn is_youtube(request: &ApiRequest) -> bool {
    request.url.host_str() == Some(YOUTUBE_HOST)
}

pub fn is_vimeo(request: &ApiRequest) -> bool {
    request.url.host_str() == Some(VIMEO_HOST)
}

/// Fake provider APIs.
///
/// Every YouTube video reports `youtube_views`, every Vimeo video reports
/// `vimeo_plays`. Playlists resolve from `playlists`, each entry being the
/// playlist id and its pages of member ids.
#[derive(Clone, Default)]
pub struct FakeApis {
    pub youtube_views: u64,
    pub vimeo_plays: u64,
    pub playlists: Vec<(String, Vec<Vec<String>>)>,
    pub failing_host: Option<&'static str>,
}

impl FakeApis {
    pub fn new(youtube_views: u64, vimeo_plays: u64) -> Self {
        Self {
            youtube_views,
            vimeo_plays,
            ..Self::default()
        }
    }

    pub fn with_playlist(mut self, id: &str, pages: Vec<Vec<String>>) -> Self {
        self.playlists.push((id.to_string(), pages));
        self
    }

    pub fn failing(mut self, host: &'static str) -> Self {
        self.failing_host = Some(host);
        self
    }

    pub fn into_transport(self) -> Arc<ScriptedTransport> {
        Arc::new(ScriptedTransport::new(move |request| self.respond(request)))
    }

    fn respond(&self, request: &ApiRequest) -> TransportResponse {
        if self.failing_host == request.url.host_str() {
            return TransportResponse {
                status: 500,
                body: r#"{"error":"backend unavailable"}"#.to_string(),
            };
        }

        if is_vimeo(request) {
            let data: Vec<Value> = requested_ids(request, "uris")
                .into_iter()
                .map(|uri| json!({ "uri": uri, "stats": { "plays": self.vimeo_plays } }))
                .collect();
            return ok_json(json!({ "data": data }));
        }

        if request.url.path().ends_with("/playlistItems") {
            return self.playlist_page(request);
        }

        let views = self.youtube_views.to_string();
        let items: Vec<Value> = requested_ids(request, "id")
            .into_iter()
            .map(|id| json!({ "id": id, "statistics": { "viewCount": views } }))
            .collect();
        ok_json(json!({ "items": items }))
    }

    fn playlist_page(&self, request: &ApiRequest) -> TransportResponse {
        let playlist_id = query_param(request, "playlistId").unwrap_or_default();
        let page_index = query_param(request, "pageToken")
            .and_then(|token| token.strip_prefix("page-").map(str::to_string))
            .and_then(|index| index.parse::<usize>().ok())
            .unwrap_or(0);

        let Some((_, pages)) = self.playlists.iter().find(|(id, _)| *id == playlist_id) else {
            return TransportResponse {
                status: 404,
                body: r#"{"error":"playlistNotFound"}"#.to_string(),
            };
        };

        let members = pages.get(page_index).cloned().unwrap_or_default();
        let items: Vec<Value> = members
            .into_iter()
            .map(|id| json!({ "contentDetails": { "videoId": id } }))
            .collect();

        let mut body = json!({ "items": items });
        if page_index + 1 < pages.len() {
            body["nextPageToken"] = json!(format!("page-{}", page_index + 1));
        }
        ok_json(body)
    }
}

/// Video ids `prefix0000`, `prefix0001`, ...
pub fn numbered_ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|n| format!("{prefix}{n:04}")).collect()
}

pub fn youtube_embed(id: &str) -> String {
    format!("https://www.youtube.com/embed/{id}")
}

pub fn vimeo_embed(id: &str) -> String {
    format!("https://player.vimeo.com/video/{id}")
}

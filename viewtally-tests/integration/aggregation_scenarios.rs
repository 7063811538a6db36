//! Whole-corpus aggregation scenarios against scripted provider APIs.

use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;
use viewtally_core::providers::scripted::ScriptedTransport;
use viewtally_core::{
    Provider, ViewCountAggregator, ViewTallyConfig, ViewTallyError, select_extractor,
};

use crate::fixtures::{
    FakeApis, VIMEO_HOST, YOUTUBE_HOST, config_in, is_vimeo, is_youtube, numbered_ids,
    requested_ids, vimeo_embed, write_records, youtube_embed,
};

fn aggregator(config: &ViewTallyConfig, transport: Arc<ScriptedTransport>) -> ViewCountAggregator {
    ViewCountAggregator::new(config, select_extractor(&config.corpus), transport)
}

async fn aggregate(
    config: &ViewTallyConfig,
    transport: Arc<ScriptedTransport>,
) -> viewtally_core::Result<viewtally_core::ViewCountSummary> {
    aggregator(config, transport).aggregate().await
}

fn summary_without_timestamp(summary: &viewtally_core::ViewCountSummary) -> Value {
    let mut value = serde_json::to_value(summary).unwrap();
    let updated_at = value
        .as_object_mut()
        .unwrap()
        .remove("updatedAt")
        .expect("updatedAt is always present");
    assert!(updated_at.as_str().unwrap().ends_with('Z'));
    value
}

#[tokio::test]
async fn test_empty_corpus_reports_zero_without_requests() {
    let dir = TempDir::new().unwrap();
    let records = json!([{ "slug": "stills-only", "title": "Photo series" }]);
    write_records(dir.path(), records);
    let config = config_in(dir.path(), true, true);
    let transport = FakeApis::new(42, 7).into_transport();

    let summary = aggregate(&config, transport.clone()).await.unwrap();

    assert_eq!(summary.total, 0);
    assert_eq!(summary.counts.youtube_videos, 0);
    assert_eq!(summary.counts.vimeo_videos, 0);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_empty_corpus_reports_offset() {
    let dir = TempDir::new().unwrap();
    write_records(dir.path(), json!([]));
    let mut config = config_in(dir.path(), true, false);
    config.aggregation.view_offset = 1_000;

    let summary = aggregator(&config, FakeApis::new(42, 0).into_transport())
        .aggregate()
        .await
        .unwrap();

    assert_eq!(summary.total, 1_000);
    assert_eq!(summary.youtube, 0);
}

#[tokio::test]
async fn test_single_youtube_video() {
    let dir = TempDir::new().unwrap();
    let records = json!([{ "slug": "reel", "embedUrl": youtube_embed("abc123XYZ_-") }]);
    write_records(dir.path(), records);
    let config = config_in(dir.path(), true, false);
    let transport = FakeApis::new(42, 0).into_transport();

    let summary = aggregate(&config, transport.clone()).await.unwrap();

    assert_eq!(
        summary_without_timestamp(&summary),
        json!({
            "total": 42,
            "youtube": 42,
            "vimeo": 0,
            "counts": { "youtubeVideos": 1, "vimeoVideos": 0 }
        })
    );

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requested_ids(&requests[0], "id"), vec!["abc123XYZ_-"]);
}

#[tokio::test]
async fn test_both_providers_sum_into_total() {
    let dir = TempDir::new().unwrap();
    write_records(
        dir.path(),
        json!([
            { "slug": "a", "embedUrl": youtube_embed("firstVideo1") },
            {
                "slug": "b",
                "heroEmbedUrl": vimeo_embed("76979871"),
                "videos": [
                    { "title": "Cut 1", "embedUrl": youtube_embed("secondVideo") },
                    { "title": "Cut 2", "embedUrl": vimeo_embed("22439234") }
                ]
            }
        ]),
    );
    let config = config_in(dir.path(), true, true);
    let transport = FakeApis::new(100, 25).into_transport();

    let summary = aggregate(&config, transport.clone()).await.unwrap();

    assert_eq!(summary.youtube, 200);
    assert_eq!(summary.vimeo, 50);
    assert_eq!(summary.total, 250);
    assert_eq!(summary.counts.youtube_videos, 2);
    assert_eq!(summary.counts.vimeo_videos, 2);

    let vimeo_requests: Vec<_> = transport
        .requests()
        .into_iter()
        .filter(is_vimeo)
        .collect();
    assert_eq!(vimeo_requests.len(), 1);
    assert_eq!(
        vimeo_requests[0].bearer_token.as_deref(),
        Some("vimeo-token")
    );
    assert_eq!(
        requested_ids(&vimeo_requests[0], "uris"),
        vec!["/videos/76979871", "/videos/22439234"]
    );
}

#[tokio::test]
async fn test_requests_respect_provider_ceilings() {
    let youtube_ids = numbered_ids("clip", 120);
    let vimeo_ids = numbered_ids("5500", 45);

    let dir = TempDir::new().unwrap();
    let mut records: Vec<Value> = youtube_ids
        .iter()
        .map(|id| json!({ "embedUrl": youtube_embed(id) }))
        .collect();
    records.extend(
        vimeo_ids
            .iter()
            .map(|id| json!({ "embedUrl": vimeo_embed(id) })),
    );
    write_records(dir.path(), Value::Array(records));

    let config = config_in(dir.path(), true, true);
    let transport = FakeApis::new(1, 2).into_transport();

    let summary = aggregate(&config, transport.clone()).await.unwrap();

    assert_eq!(summary.youtube, 120);
    assert_eq!(summary.vimeo, 90);

    let requests = transport.requests();
    let youtube_batches: Vec<usize> = requests
        .iter()
        .filter(|r| is_youtube(r))
        .map(|r| requested_ids(r, "id").len())
        .collect();
    let vimeo_batches: Vec<usize> = requests
        .iter()
        .filter(|r| is_vimeo(r))
        .map(|r| requested_ids(r, "uris").len())
        .collect();

    assert_eq!(youtube_batches, vec![50, 50, 20]);
    assert_eq!(vimeo_batches, vec![20, 20, 5]);
}

#[tokio::test]
async fn test_playlist_expansion_dedupes_against_direct_ids() {
    let members = numbered_ids("member", 53);
    let dir = TempDir::new().unwrap();
    write_records(
        dir.path(),
        json!([
            { "embedUrl": youtube_embed("directOne1") },
            { "embedUrl": youtube_embed(&members[0]) },
            { "embedUrl": "https://www.youtube.com/embed/videoseries?list=PLseries42" }
        ]),
    );
    let config = config_in(dir.path(), true, false);
    let pages = vec![members[..50].to_vec(), members[50..].to_vec()];
    let transport = FakeApis::new(3, 0)
        .with_playlist("PLseries42", pages)
        .into_transport();

    let summary = aggregate(&config, transport.clone()).await.unwrap();

    assert_eq!(transport.requests_to("/playlistItems").len(), 2);
    let statistics = transport.requests_to("/videos");
    assert_eq!(statistics.len(), 2);

    let mut requested: Vec<String> = statistics
        .iter()
        .flat_map(|r| requested_ids(r, "id"))
        .collect();
    let requested_len = requested.len();
    requested.sort();
    requested.dedup();
    assert_eq!(requested.len(), requested_len, "no id requested twice");
    assert_eq!(requested_len, 54);

    assert_eq!(summary.counts.youtube_videos, 54);
    assert_eq!(summary.counts.youtube_playlists, 1);
    assert_eq!(summary.youtube, 54 * 3);
}

#[tokio::test]
async fn test_upstream_failure_fails_whole_request() {
    let dir = TempDir::new().unwrap();
    write_records(
        dir.path(),
        json!([
            { "embedUrl": youtube_embed("abc123XYZ_-") },
            { "embedUrl": vimeo_embed("76979871") }
        ]),
    );
    let config = config_in(dir.path(), true, true);
    let transport = FakeApis::new(42, 7).failing(YOUTUBE_HOST).into_transport();

    let error = aggregate(&config, transport).await.unwrap_err();

    match error {
        ViewTallyError::Upstream {
            provider,
            status,
            message,
        } => {
            assert_eq!(provider, Provider::YouTube);
            assert_eq!(status, Some(500));
            assert!(message.contains("backend unavailable"));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_degrade_policy_reports_failed_provider() {
    let dir = TempDir::new().unwrap();
    write_records(
        dir.path(),
        json!([
            { "embedUrl": youtube_embed("abc123XYZ_-") },
            { "embedUrl": vimeo_embed("76979871") }
        ]),
    );
    let mut config = config_in(dir.path(), true, true);
    config.aggregation.failure_policy = viewtally_core::FailurePolicy::Degrade;
    let transport = FakeApis::new(42, 7).failing(VIMEO_HOST).into_transport();

    let summary = aggregate(&config, transport).await.unwrap();

    assert_eq!(summary.total, 42);
    assert_eq!(summary.vimeo, 0);
    assert_eq!(summary.failed_providers, vec![Provider::Vimeo]);

    let body = serde_json::to_value(&summary).unwrap();
    assert_eq!(body["failedProviders"], json!(["vimeo"]));
}

#[tokio::test]
async fn test_missing_vimeo_token_skips_provider() {
    let dir = TempDir::new().unwrap();
    write_records(
        dir.path(),
        json!([
            { "embedUrl": youtube_embed("abc123XYZ_-") },
            { "embedUrl": vimeo_embed("76979871") }
        ]),
    );
    let config = config_in(dir.path(), true, false);
    let transport = FakeApis::new(42, 7).into_transport();

    let summary = aggregate(&config, transport.clone()).await.unwrap();

    assert_eq!(summary.total, 42);
    assert_eq!(summary.vimeo, 0);
    assert_eq!(summary.counts.vimeo_videos, 1);
    assert!(transport.requests().iter().all(is_youtube));
}

#[tokio::test]
async fn test_no_credentials_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    let records = json!([{ "embedUrl": youtube_embed("abc123XYZ_-") }]);
    write_records(dir.path(), records);
    let config = config_in(dir.path(), false, false);
    let transport = FakeApis::new(42, 7).into_transport();

    let error = aggregate(&config, transport.clone()).await.unwrap_err();

    assert!(matches!(error, ViewTallyError::Configuration { .. }));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_supplementary_ids_join_the_corpus() {
    let dir = TempDir::new().unwrap();
    let records = json!([{ "embedUrl": youtube_embed("abc123XYZ_-") }]);
    write_records(dir.path(), records);
    let mut config = config_in(dir.path(), true, true);
    config.aggregation.supplementary.youtube_videos =
        vec!["abc123XYZ_-".to_string(), "unlisted001".to_string()];
    config.aggregation.supplementary.vimeo_videos = vec!["1000001".to_string()];

    let summary = aggregator(&config, FakeApis::new(10, 4).into_transport())
        .aggregate()
        .await
        .unwrap();

    assert_eq!(summary.counts.youtube_videos, 2);
    assert_eq!(summary.counts.vimeo_videos, 1);
    assert_eq!(summary.total, 24);
}

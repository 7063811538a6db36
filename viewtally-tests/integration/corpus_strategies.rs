//! Corpus strategy selection: structured records first, source text second.

use serde_json::json;
use tempfile::TempDir;
use viewtally_core::{ViewTallyError, select_extractor};

use crate::fixtures::{config_in, write_records, write_source_text, youtube_embed};

const SOURCE_TEXT: &str = r#"
export const projects: Project[] = [
  {
    slug: "night-shift",
    embedUrl: "https://www.youtube.com/embed/nightShift01?rel=0",
    videos: [
      { title: "Teaser", embedUrl: 'https://player.vimeo.com/video/76979871' },
      { title: "Series", embedUrl: `//www.youtube.com/embed/videoseries?list=PLnight` },
    ],
    // https://example.com/embed/v2 is not a video
    links: ["https://example.com/about"],
  },
];
"#;

#[tokio::test]
async fn test_records_file_is_preferred() {
    let dir = TempDir::new().unwrap();
    let records = json!([{ "embedUrl": youtube_embed("fromRecords") }]);
    write_records(dir.path(), records);
    write_source_text(dir.path(), SOURCE_TEXT);
    let config = config_in(dir.path(), true, false);

    let ids = select_extractor(&config.corpus).extract().await.unwrap();

    assert_eq!(ids.youtube_videos.as_slice(), ["fromRecords"]);
    assert!(ids.vimeo_videos.is_empty());
}

#[tokio::test]
async fn test_source_text_fallback() {
    let dir = TempDir::new().unwrap();
    write_source_text(dir.path(), SOURCE_TEXT);
    let config = config_in(dir.path(), true, false);

    let ids = select_extractor(&config.corpus).extract().await.unwrap();

    assert_eq!(ids.youtube_videos.as_slice(), ["nightShift01"]);
    assert_eq!(ids.youtube_playlists.as_slice(), ["PLnight"]);
    assert_eq!(ids.vimeo_videos.as_slice(), ["76979871"]);
}

#[tokio::test]
async fn test_missing_corpus_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path(), true, false);

    let error = select_extractor(&config.corpus)
        .extract()
        .await
        .unwrap_err();

    assert!(matches!(error, ViewTallyError::CorpusUnavailable { .. }));
}

#[tokio::test]
async fn test_malformed_records_are_unavailable() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("projects.json"), "{ not json").unwrap();
    write_source_text(dir.path(), SOURCE_TEXT);
    let config = config_in(dir.path(), true, false);

    let error = select_extractor(&config.corpus)
        .extract()
        .await
        .unwrap_err();

    assert!(matches!(error, ViewTallyError::CorpusUnavailable { .. }));
}

#[tokio::test]
async fn test_every_reference_field_is_read() {
    let dir = TempDir::new().unwrap();
    write_records(
        dir.path(),
        json!([
            {
                "slug": "anthology",
                "heroEmbedUrl": youtube_embed("heroVideo01"),
                "videoSections": [
                    {
                        "title": "Season 1",
                        "videos": [
                            { "embedUrl": youtube_embed("episode0101") },
                            { "embedUrl": youtube_embed("heroVideo01") }
                        ]
                    }
                ],
                "platformIds": { "youtube": ["explicitYt1"], "vimeo": ["1234567"] }
            }
        ]),
    );
    let config = config_in(dir.path(), true, true);

    let ids = select_extractor(&config.corpus).extract().await.unwrap();

    assert_eq!(
        ids.youtube_videos.as_slice(),
        ["explicitYt1", "heroVideo01", "episode0101"]
    );
    assert_eq!(ids.vimeo_videos.as_slice(), ["1234567"]);
}

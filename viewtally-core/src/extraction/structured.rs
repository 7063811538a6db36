//! Structured access to the content records.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use super::{IdentifierExtractor, IdentifierSet};
use crate::{Result, ViewTallyError};

/// One embedded video inside a project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVideo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
}

/// A named group of videos, e.g. one season of a series.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSection {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub videos: Vec<ProjectVideo>,
}

/// Explicit provider ids attached to a project.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformIds {
    #[serde(default)]
    pub youtube: Vec<String>,
    #[serde(default)]
    pub vimeo: Vec<String>,
}

/// A project from the content catalog.
///
/// Only the fields that can reference a video are modeled; everything else
/// in the catalog is ignored during deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub hero_embed_url: Option<String>,
    #[serde(default)]
    pub videos: Vec<ProjectVideo>,
    #[serde(default)]
    pub video_sections: Vec<VideoSection>,
    #[serde(default)]
    pub platform_ids: Option<PlatformIds>,
}

impl ContentRecord {
    /// Every URL this record carries in a known reference field.
    pub fn candidate_urls(&self) -> impl Iterator<Item = &str> {
        let sectioned = self
            .video_sections
            .iter()
            .flat_map(|section| section.videos.iter());

        self.embed_url
            .iter()
            .chain(self.hero_embed_url.iter())
            .chain(
                self.videos
                    .iter()
                    .chain(sectioned)
                    .filter_map(|video| video.embed_url.as_ref()),
            )
            .map(String::as_str)
    }
}

impl IdentifierSet {
    /// Builds identifier collections from structured content records.
    ///
    /// Explicit `platformIds` are taken verbatim; embed URLs are classified.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ContentRecord>) -> Self {
        let mut set = IdentifierSet::new();
        for record in records {
            if let Some(ids) = &record.platform_ids {
                set.youtube_videos.extend(ids.youtube.iter().cloned());
                set.vimeo_videos.extend(ids.vimeo.iter().cloned());
            }
            for url in record.candidate_urls() {
                set.insert_url(url);
            }
        }
        set
    }
}

#[derive(Debug)]
enum RecordSource {
    File(PathBuf),
    Memory(Vec<ContentRecord>),
}

/// Extracts identifiers from a JSON array of [`ContentRecord`]s.
#[derive(Debug)]
pub struct StructuredExtractor {
    source: RecordSource,
}

impl StructuredExtractor {
    /// Reads records from `path` on every extraction.
    pub fn from_file(path: PathBuf) -> Self {
        Self {
            source: RecordSource::File(path),
        }
    }

    /// Wraps records that are already loaded.
    pub fn from_records(records: Vec<ContentRecord>) -> Self {
        Self {
            source: RecordSource::Memory(records),
        }
    }

    /// Loads and parses the records file.
    ///
    /// # Errors
    ///
    /// - `ViewTallyError::CorpusUnavailable` - If the file cannot be read or parsed
    pub async fn load_records(path: &Path) -> Result<Vec<ContentRecord>> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| unavailable(path, "read", e))?;

        serde_json::from_str(&text).map_err(|e| unavailable(path, "parse", e))
    }
}

fn unavailable(path: &Path, action: &str, error: impl std::fmt::Display) -> ViewTallyError {
    ViewTallyError::CorpusUnavailable {
        reason: format!("cannot {action} {}: {error}", path.display()),
    }
}

#[async_trait]
impl IdentifierExtractor for StructuredExtractor {
    async fn extract(&self) -> Result<IdentifierSet> {
        match &self.source {
            RecordSource::File(path) => {
                let records = Self::load_records(path).await?;
                tracing::debug!("Loaded {} content records", records.len());
                Ok(IdentifierSet::from_records(&records))
            }
            RecordSource::Memory(records) => Ok(IdentifierSet::from_records(records)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_hunters() -> ContentRecord {
        serde_json::from_value(serde_json::json!({
            "title": "Job Hunters",
            "slug": "job-hunters",
            "tags": ["Series", "Original"],
            "heroEmbedUrl": "https://www.youtube.com/embed/i1Z9poBq764",
            "videoSections": [
                {
                    "title": "Season One",
                    "videos": [
                        { "title": "Ep 1", "embedUrl": "https://www.youtube.com/embed/shhPwitFW2g" },
                        { "title": "Ep 2", "embedUrl": "https://www.youtube.com/embed/M8Hno8oe86M" }
                    ]
                },
                {
                    "title": "Season Two",
                    "videos": [
                        { "title": "Recap", "embedUrl": "https://www.youtube.com/embed/shhPwitFW2g" }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_candidate_urls_cover_every_field() {
        let record = ContentRecord {
            embed_url: Some("a".to_string()),
            hero_embed_url: Some("b".to_string()),
            videos: vec![ProjectVideo {
                title: None,
                embed_url: Some("c".to_string()),
            }],
            video_sections: vec![VideoSection {
                title: Some("s".to_string()),
                videos: vec![
                    ProjectVideo {
                        title: None,
                        embed_url: Some("d".to_string()),
                    },
                    ProjectVideo::default(),
                ],
            }],
            ..ContentRecord::default()
        };
        let urls: Vec<&str> = record.candidate_urls().collect();
        assert_eq!(urls, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_sections_and_hero_are_collected_once() {
        let set = IdentifierSet::from_records(&[job_hunters()]);
        assert_eq!(
            set.youtube_videos.as_slice(),
            ["i1Z9poBq764", "shhPwitFW2g", "M8Hno8oe86M"]
        );
        assert!(set.vimeo_videos.is_empty());
    }

    #[test]
    fn test_duplicates_across_records_collapse() {
        let vimeo: ContentRecord = serde_json::from_value(serde_json::json!({
            "embedUrl": "https://player.vimeo.com/video/123456789",
            "videos": [{ "embedUrl": "https://player.vimeo.com/video/123456789" }]
        }))
        .unwrap();
        let set = IdentifierSet::from_records(&[vimeo.clone(), vimeo, job_hunters()]);
        assert_eq!(set.vimeo_videos.as_slice(), ["123456789"]);
        assert_eq!(set.youtube_videos.len(), 3);
    }

    #[test]
    fn test_platform_ids_are_included() {
        let record: ContentRecord = serde_json::from_value(serde_json::json!({
            "platformIds": { "youtube": ["explicit001"], "vimeo": ["42"] }
        }))
        .unwrap();
        let set = IdentifierSet::from_records(&[record]);
        assert_eq!(set.youtube_videos.as_slice(), ["explicit001"]);
        assert_eq!(set.vimeo_videos.as_slice(), ["42"]);
    }

    #[test]
    fn test_record_without_references_contributes_nothing() {
        let record: ContentRecord = serde_json::from_value(serde_json::json!({
            "title": "Press kit",
            "thumbnailUrl": "/thumbnails/press.webp"
        }))
        .unwrap();
        assert!(IdentifierSet::from_records(&[record]).is_empty());
    }

    #[tokio::test]
    async fn test_extract_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        std::fs::write(
            &path,
            r#"[
                {"embedUrl": "https://www.youtube.com/embed/videoseries?list=PLabc123"},
                {"embedUrl": "https://www.instagram.com/reel/Cuz0gdrIz5h/embed"}
            ]"#,
        )
        .unwrap();

        let extractor = StructuredExtractor::from_file(path);
        let set = extractor.extract().await.unwrap();
        assert_eq!(set.youtube_playlists.as_slice(), ["PLabc123"]);
        assert!(set.youtube_videos.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file_is_corpus_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        std::fs::write(&path, "export const projects = [];").unwrap();

        let result = StructuredExtractor::from_file(path).extract().await;
        assert!(matches!(
            result,
            Err(ViewTallyError::CorpusUnavailable { .. })
        ));
    }
}

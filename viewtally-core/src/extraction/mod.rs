//! Identifier extraction from the site's content corpus.
//!
//! Two interchangeable strategies produce the same [`IdentifierSet`]:
//! structured access to the content records, and a text scan over the raw
//! source of the content module. [`select_extractor`] picks between them
//! at request time based on what is present in the deployment.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, Serializer};

use crate::config::CorpusConfig;
use crate::{Result, ViewTallyError};

pub mod classify;
pub mod structured;
pub mod text_scan;

pub use classify::{MIN_VIDEO_ID_LEN, VideoReference, classify_url};
pub use structured::{ContentRecord, PlatformIds, ProjectVideo, StructuredExtractor, VideoSection};
pub use text_scan::{SourceTextExtractor, scan_source_text};

/// Deduplicated identifiers in first-seen order.
///
/// Equality is exact and case-sensitive; provider ids are opaque tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueIds {
    ids: Vec<String>,
    seen: HashSet<String>,
}

impl UniqueIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identifier. Returns `false` when it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.seen.contains(&id) {
            return false;
        }
        self.seen.insert(id.clone());
        self.ids.push(id);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for UniqueIds {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut ids = UniqueIds::new();
        ids.extend(iter);
        ids
    }
}

impl<S: Into<String>> Extend<S> for UniqueIds {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}

impl Serialize for UniqueIds {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.ids.serialize(serializer)
    }
}

/// Operator-configured identifiers that cannot be discovered in the corpus,
/// such as unlisted or private videos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplementaryIds {
    pub youtube_videos: Vec<String>,
    pub youtube_playlists: Vec<String>,
    pub vimeo_videos: Vec<String>,
}

/// The three identifier collections produced for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierSet {
    pub youtube_videos: UniqueIds,
    pub youtube_playlists: UniqueIds,
    pub vimeo_videos: UniqueIds,
}

impl IdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files a classified reference into its collection.
    pub fn insert(&mut self, reference: VideoReference) {
        match reference {
            VideoReference::YouTubeVideo(id) => self.youtube_videos.insert(id),
            VideoReference::YouTubePlaylist(id) => self.youtube_playlists.insert(id),
            VideoReference::VimeoVideo(id) => self.vimeo_videos.insert(id),
        };
    }

    /// Classifies `url` and files it when it matches a known shape.
    pub fn insert_url(&mut self, url: &str) {
        if let Some(reference) = classify_url(url) {
            self.insert(reference);
        }
    }

    /// Unions the operator's out-of-band identifiers into this set.
    pub fn merge_supplementary(&mut self, extra: &SupplementaryIds) {
        self.youtube_videos
            .extend(extra.youtube_videos.iter().cloned());
        self.youtube_playlists
            .extend(extra.youtube_playlists.iter().cloned());
        self.vimeo_videos.extend(extra.vimeo_videos.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.youtube_videos.is_empty()
            && self.youtube_playlists.is_empty()
            && self.vimeo_videos.is_empty()
    }
}

/// Source of identifier sets.
///
/// Implementations read the corpus on every call; nothing is cached
/// between requests.
#[async_trait]
pub trait IdentifierExtractor: Send + Sync + fmt::Debug {
    /// Produces the identifier collections for the current corpus.
    ///
    /// # Errors
    /// - `ViewTallyError::CorpusUnavailable` - The corpus cannot be located or read
    async fn extract(&self) -> Result<IdentifierSet>;
}

/// Picks structured access when the records file exists, falling back to a
/// text scan of the content module's source.
#[derive(Debug)]
pub struct CorpusExtractor {
    records_path: Option<PathBuf>,
    structured: Option<StructuredExtractor>,
    source_text: Option<SourceTextExtractor>,
}

impl CorpusExtractor {
    pub fn new(corpus: &CorpusConfig) -> Self {
        let CorpusConfig {
            records_path,
            source_text_path,
        } = corpus.clone();

        Self {
            structured: records_path.clone().map(StructuredExtractor::from_file),
            source_text: source_text_path.map(SourceTextExtractor::new),
            records_path,
        }
    }
}

#[async_trait]
impl IdentifierExtractor for CorpusExtractor {
    async fn extract(&self) -> Result<IdentifierSet> {
        if let (Some(path), Some(structured)) = (&self.records_path, &self.structured) {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                tracing::debug!("Extracting identifiers from records {}", path.display());
                return structured.extract().await;
            }
            tracing::debug!(
                "Records file {} not present, trying source text fallback",
                path.display()
            );
        }

        match &self.source_text {
            Some(scanner) => scanner.extract().await,
            None => Err(ViewTallyError::CorpusUnavailable {
                reason: match &self.records_path {
                    Some(path) => format!(
                        "records file {} not found and no source text configured",
                        path.display()
                    ),
                    None => "no content corpus configured".to_string(),
                },
            }),
        }
    }
}

/// Builds the extractor used by the request handler.
pub fn select_extractor(corpus: &CorpusConfig) -> Box<dyn IdentifierExtractor> {
    Box::new(CorpusExtractor::new(corpus))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const SOURCE_TEXT: &str = r#"embedUrl: "https://www.youtube.com/embed/fromText01","#;

    #[test]
    fn test_unique_ids_keeps_first_occurrence() {
        let ids: UniqueIds = ["b", "a", "b", "c", "a"].into_iter().collect();
        assert_eq!(ids.as_slice(), ["b", "a", "c"]);
        assert!(ids.contains("c"));
        assert!(!ids.contains("C"));
    }

    #[test]
    fn test_unique_ids_are_case_sensitive() {
        let ids: UniqueIds = ["abc123XY", "ABC123XY"].into_iter().collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_merge_supplementary_dedupes() {
        let mut set = IdentifierSet::new();
        set.insert_url("https://www.youtube.com/embed/i1Z9poBq764");
        set.insert_url("https://player.vimeo.com/video/1001");

        set.merge_supplementary(&SupplementaryIds {
            youtube_videos: vec!["i1Z9poBq764".to_string(), "unlisted01".to_string()],
            youtube_playlists: vec!["PLhidden".to_string()],
            vimeo_videos: vec!["1001".to_string()],
        });

        assert_eq!(set.youtube_videos.as_slice(), ["i1Z9poBq764", "unlisted01"]);
        assert_eq!(set.youtube_playlists.as_slice(), ["PLhidden"]);
        assert_eq!(set.vimeo_videos.as_slice(), ["1001"]);
    }

    #[test]
    fn test_identifier_set_serializes_as_arrays() {
        let mut set = IdentifierSet::new();
        set.insert_url("https://player.vimeo.com/video/77");
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["vimeoVideos"], serde_json::json!(["77"]));
        assert_eq!(json["youtubeVideos"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_corpus_extractor_prefers_records_file() {
        let dir = tempfile::tempdir().unwrap();
        let records = dir.path().join("projects.json");
        let source = dir.path().join("projects.ts");
        std::fs::write(
            &records,
            r#"[{"slug":"a","embedUrl":"https://www.youtube.com/embed/fromJson01"}]"#,
        )
        .unwrap();
        std::fs::write(&source, SOURCE_TEXT).unwrap();

        let extractor = select_extractor(&CorpusConfig {
            records_path: Some(records),
            source_text_path: Some(source),
        });
        let set = extractor.extract().await.unwrap();
        assert_eq!(set.youtube_videos.as_slice(), ["fromJson01"]);
    }

    #[tokio::test]
    async fn test_corpus_extractor_falls_back_to_source_text() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("projects.ts");
        std::fs::write(&source, SOURCE_TEXT).unwrap();

        let extractor = select_extractor(&CorpusConfig {
            records_path: Some(dir.path().join("missing.json")),
            source_text_path: Some(source),
        });
        let set = extractor.extract().await.unwrap();
        assert_eq!(set.youtube_videos.as_slice(), ["fromText01"]);
    }

    #[tokio::test]
    async fn test_corpus_extractor_without_any_corpus_fails() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = select_extractor(&CorpusConfig {
            records_path: Some(dir.path().join("missing.json")),
            source_text_path: None,
        });
        let result = extractor.extract().await;
        assert!(matches!(
            result,
            Err(ViewTallyError::CorpusUnavailable { .. })
        ));

        let extractor = select_extractor(&CorpusConfig {
            records_path: None,
            source_text_path: None,
        });
        assert!(extractor.extract().await.is_err());
    }

    proptest! {
        #[test]
        fn prop_collections_never_hold_duplicates(
            ids in proptest::collection::vec("[a-c]{6}|[0-9]{1,2}", 0..60)
        ) {
            let mut set = IdentifierSet::new();
            for id in &ids {
                if id.bytes().all(|b| b.is_ascii_digit()) {
                    set.insert_url(&format!("https://player.vimeo.com/video/{id}"));
                } else {
                    set.insert_url(&format!("https://www.youtube.com/embed/{id}"));
                }
            }

            for collection in [&set.youtube_videos, &set.vimeo_videos] {
                let distinct: HashSet<&str> = collection.iter().collect();
                prop_assert_eq!(distinct.len(), collection.len());
            }
            let expected: HashSet<&String> = ids.iter().collect();
            prop_assert_eq!(
                set.youtube_videos.len() + set.vimeo_videos.len(),
                expected.len()
            );
        }
    }
}

//! Text-scan fallback over the raw source of the content module.
//!
//! Used when the structured records are not shipped alongside the service.
//! Every URL-shaped substring is classified with the same rules as
//! structured access, so both strategies agree on what counts as a video.

use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{IdentifierExtractor, IdentifierSet};
use crate::{Result, ViewTallyError};

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:https?:)?//[^\s"'`<>()\[\]{}\\]+"#).expect("URL pattern is valid")
});

/// Trailing punctuation that belongs to the surrounding prose, not the URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// Scans arbitrary text for embed URLs.
pub fn scan_source_text(text: &str) -> IdentifierSet {
    let mut set = IdentifierSet::new();
    for candidate in URL_PATTERN.find_iter(text) {
        set.insert_url(candidate.as_str().trim_end_matches(TRAILING_PUNCTUATION));
    }
    set
}

/// Extracts identifiers by scanning a source file.
#[derive(Debug, Clone)]
pub struct SourceTextExtractor {
    path: PathBuf,
}

impl SourceTextExtractor {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl IdentifierExtractor for SourceTextExtractor {
    async fn extract(&self) -> Result<IdentifierSet> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ViewTallyError::CorpusUnavailable {
                reason: format!("cannot read {}: {e}", self.path.display()),
            })?;

        tracing::debug!(
            "Scanning {} bytes of source text from {}",
            text.len(),
            self.path.display()
        );
        Ok(scan_source_text(&text))
    }
}

//! Centralized configuration for Viewtally.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase. Credentials and
//! operator overrides come from the process environment once, at startup,
//! and are passed around as an explicit value afterwards.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::extraction::SupplementaryIds;
use crate::{Result, ViewTallyError};

/// Central configuration for all Viewtally components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct ViewTallyConfig {
    pub server: ServerConfig,
    pub corpus: CorpusConfig,
    pub youtube: YouTubeConfig,
    pub vimeo: VimeoConfig,
    pub aggregation: AggregationConfig,
    pub cache: CachePolicy,
    pub cors: CorsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Where the content corpus lives.
///
/// The structured records file is preferred. The source text path is the
/// fallback used when the records file is not present in the deployment.
#[derive(Debug, Clone)]
pub struct CorpusConfig {
    /// JSON array of content records
    pub records_path: Option<PathBuf>,
    /// Raw source text of the content module, scanned for embed URLs
    pub source_text_path: Option<PathBuf>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            records_path: Some(PathBuf::from("content/projects.json")),
            source_text_path: Some(PathBuf::from("src/content/projects.ts")),
        }
    }
}

/// YouTube Data API settings.
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    /// API key; the provider is skipped when absent
    pub api_key: Option<String>,
    /// Base URL of the Data API, overridable for staging and tests
    pub base_url: String,
    /// Upper bound on playlist pages followed for a single playlist
    pub max_playlist_pages: usize,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            max_playlist_pages: 200,
        }
    }
}

/// Vimeo API settings.
#[derive(Debug, Clone)]
pub struct VimeoConfig {
    /// Bearer token; the provider is skipped when absent
    pub access_token: Option<String>,
    pub base_url: String,
}

impl Default for VimeoConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            base_url: "https://api.vimeo.com".to_string(),
        }
    }
}

/// How a configured provider's failure affects the whole request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Any upstream failure fails the request
    #[default]
    FailFast,
    /// A failed provider contributes zero and is reported in the summary
    Degrade,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail-fast" | "failfast" | "strict" => Ok(FailurePolicy::FailFast),
            "degrade" | "partial" => Ok(FailurePolicy::Degrade),
            _ => Err(format!("Invalid failure policy: {s}")),
        }
    }
}

/// Aggregation behavior shared by both providers.
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    /// Manually tracked views added to every total
    pub view_offset: u64,
    /// Identifiers known to the operator but absent from the corpus
    pub supplementary: SupplementaryIds,
    pub failure_policy: FailurePolicy,
    /// Timeout applied to each outbound provider request
    pub request_timeout: Duration,
    /// User agent for outbound requests
    pub user_agent: &'static str,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            view_offset: 0,
            supplementary: SupplementaryIds::default(),
            failure_policy: FailurePolicy::FailFast,
            request_timeout: Duration::from_secs(8),
            user_agent: "viewtally/0.1.0",
        }
    }
}

/// Cache-control policy for successful responses.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Freshness window for shared caches
    pub shared_max_age: Duration,
    /// Window in which a stale response may be served while revalidating
    pub stale_while_revalidate: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            shared_max_age: Duration::from_secs(3600),           // 1 hour
            stale_while_revalidate: Duration::from_secs(86_400), // 1 day
        }
    }
}

impl CachePolicy {
    /// Renders the `Cache-Control` header value for a successful response.
    pub fn header_value(&self) -> String {
        format!(
            "s-maxage={}, stale-while-revalidate={}",
            self.shared_max_age.as_secs(),
            self.stale_while_revalidate.as_secs()
        )
    }
}

/// Cross-origin policy for the endpoint.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Origins echoed back verbatim
    pub allowed_origins: Vec<String>,
    /// Origin returned when the request's origin is not recognized
    pub default_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
            default_origin: "http://localhost:5173".to_string(),
        }
    }
}

impl ViewTallyConfig {
    /// Builds configuration from defaults plus process environment overrides.
    ///
    /// # Errors
    ///
    /// - `ViewTallyError::Configuration` - If a numeric or enum variable cannot be parsed
    pub fn from_env() -> Result<Self> {
        Self::from_env_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from defaults plus overrides served by `lookup`.
    ///
    /// Empty values are treated as absent.
    ///
    /// # Errors
    ///
    /// - `ViewTallyError::Configuration` - If a numeric or enum variable cannot be parsed
    pub fn from_env_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.youtube.api_key = get("YOUTUBE_API_KEY");
        config.vimeo.access_token = get("VIMEO_ACCESS_TOKEN");

        if let Some(url) = get("VIEWTALLY_YOUTUBE_BASE_URL") {
            config.youtube.base_url = url;
        }
        if let Some(url) = get("VIEWTALLY_VIMEO_BASE_URL") {
            config.vimeo.base_url = url;
        }
        if let Some(path) = get("VIEWTALLY_RECORDS_PATH") {
            config.corpus.records_path = Some(PathBuf::from(path));
        }
        if let Some(path) = get("VIEWTALLY_SOURCE_TEXT_PATH") {
            config.corpus.source_text_path = Some(PathBuf::from(path));
        }
        if let Some(offset) = get("VIEWTALLY_VIEW_OFFSET") {
            config.aggregation.view_offset = parse_var("VIEWTALLY_VIEW_OFFSET", &offset)?;
        }
        if let Some(secs) = get("VIEWTALLY_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = parse_var("VIEWTALLY_REQUEST_TIMEOUT_SECS", &secs)?;
            if secs == 0 {
                return Err(ViewTallyError::Configuration {
                    reason: "VIEWTALLY_REQUEST_TIMEOUT_SECS must be at least 1".to_string(),
                });
            }
            config.aggregation.request_timeout = Duration::from_secs(secs);
        }
        if let Some(policy) = get("VIEWTALLY_FAILURE_POLICY") {
            config.aggregation.failure_policy = policy
                .parse()
                .map_err(|reason| ViewTallyError::Configuration { reason })?;
        }

        let supplementary = &mut config.aggregation.supplementary;
        supplementary.youtube_videos = split_list(get("VIEWTALLY_EXTRA_YOUTUBE_IDS"));
        supplementary.youtube_playlists = split_list(get("VIEWTALLY_EXTRA_YOUTUBE_PLAYLISTS"));
        supplementary.vimeo_videos = split_list(get("VIEWTALLY_EXTRA_VIMEO_IDS"));

        if let Some(origins) = get("VIEWTALLY_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = split_list(Some(origins));
        }
        if let Some(origin) = get("VIEWTALLY_DEFAULT_ORIGIN") {
            config.cors.default_origin = origin;
        }

        Ok(config)
    }

    /// Checks whether at least one provider credential is present.
    pub fn has_any_credential(&self) -> bool {
        self.youtube.api_key.is_some() || self.vimeo.access_token.is_some()
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| ViewTallyError::Configuration {
        reason: format!("{key} has invalid value '{value}'"),
    })
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = ViewTallyConfig::from_env_lookup(|_| None).unwrap();
        assert!(config.youtube.api_key.is_none());
        assert!(config.vimeo.access_token.is_none());
        assert!(!config.has_any_credential());
        assert_eq!(config.aggregation.view_offset, 0);
        assert_eq!(config.aggregation.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.aggregation.request_timeout, Duration::from_secs(8));
    }

    #[test]
    fn test_empty_credentials_count_as_absent() {
        let lookup = lookup_from(&[("YOUTUBE_API_KEY", "  "), ("VIMEO_ACCESS_TOKEN", "")]);
        let config = ViewTallyConfig::from_env_lookup(lookup).unwrap();
        assert!(!config.has_any_credential());
    }

    #[test]
    fn test_overrides_are_applied() {
        let lookup = lookup_from(&[
            ("YOUTUBE_API_KEY", "yt-key"),
            ("VIEWTALLY_VIEW_OFFSET", "1500"),
            ("VIEWTALLY_FAILURE_POLICY", "degrade"),
            ("VIEWTALLY_EXTRA_VIMEO_IDS", "111, 222,,333"),
            ("VIEWTALLY_ALLOWED_ORIGINS", "https://a.io,https://b.io"),
            ("VIEWTALLY_REQUEST_TIMEOUT_SECS", "3"),
        ]);
        let config = ViewTallyConfig::from_env_lookup(lookup).unwrap();

        assert_eq!(config.youtube.api_key.as_deref(), Some("yt-key"));
        assert!(config.has_any_credential());
        assert_eq!(config.aggregation.view_offset, 1500);
        assert_eq!(config.aggregation.failure_policy, FailurePolicy::Degrade);
        assert_eq!(
            config.aggregation.supplementary.vimeo_videos,
            vec!["111", "222", "333"]
        );
        assert_eq!(config.cors.allowed_origins.len(), 2);
        assert_eq!(config.aggregation.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_offset_is_configuration_error() {
        let lookup = lookup_from(&[("VIEWTALLY_VIEW_OFFSET", "lots")]);
        let result = ViewTallyConfig::from_env_lookup(lookup);
        assert!(matches!(result, Err(ViewTallyError::Configuration { .. })));
    }

    #[test]
    fn test_zero_request_timeout_is_rejected() {
        let lookup = lookup_from(&[("VIEWTALLY_REQUEST_TIMEOUT_SECS", "0")]);
        match ViewTallyConfig::from_env_lookup(lookup) {
            Err(ViewTallyError::Configuration { reason }) => {
                assert!(reason.contains("VIEWTALLY_REQUEST_TIMEOUT_SECS"));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_cache_policy_header() {
        let policy = CachePolicy::default();
        assert_eq!(
            policy.header_value(),
            "s-maxage=3600, stale-while-revalidate=86400"
        );
    }
}

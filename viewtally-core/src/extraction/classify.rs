//! Classification of embed URLs into provider identifiers.

use url::Url;

/// Shortest token accepted as a YouTube video id.
///
/// Generic path segments such as `v2` in other platforms' embed paths fall
/// below this and are ignored.
pub const MIN_VIDEO_ID_LEN: usize = 6;

/// Social platforms whose embed paths share the video shapes below.
const NON_VIDEO_HOSTS: &[&str] = &[
    "instagram.com",
    "tiktok.com",
    "twitter.com",
    "x.com",
    "facebook.com",
];

/// A provider resource referenced by an embed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoReference {
    YouTubeVideo(String),
    YouTubePlaylist(String),
    VimeoVideo(String),
}

/// Classifies a single URL against the known embed shapes.
///
/// Returns `None` for anything unrecognized, including strings that do not
/// parse as URLs. Protocol-relative URLs (`//host/path`) are accepted.
pub fn classify_url(raw: &str) -> Option<VideoReference> {
    let raw = raw.trim();
    let url = if raw.starts_with("//") {
        Url::parse(&format!("https:{raw}")).ok()?
    } else {
        Url::parse(raw).ok()?
    };
    if url.host_str().is_some_and(is_non_video_host) {
        return None;
    }

    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();

    // Playlist embeds share the `/embed/` prefix, so they must be handled
    // before the single-video shape.
    if let Some(pos) = segments.iter().position(|s| *s == "embed") {
        match segments.get(pos + 1) {
            Some(&"videoseries") => {
                return url
                    .query_pairs()
                    .find(|(key, _)| key == "list")
                    .map(|(_, value)| value.into_owned())
                    .filter(|list| is_token(list, 1))
                    .map(VideoReference::YouTubePlaylist);
            }
            Some(token) if is_token(token, MIN_VIDEO_ID_LEN) => {
                return Some(VideoReference::YouTubeVideo(token.to_string()));
            }
            _ => {}
        }
    }

    if is_short_link_host(url.host_str()) {
        if let Some(token) = segments.first().filter(|t| is_token(t, MIN_VIDEO_ID_LEN)) {
            return Some(VideoReference::YouTubeVideo(token.to_string()));
        }
    }

    if let Some(pos) = segments.iter().position(|s| *s == "video") {
        if let Some(id) = segments
            .get(pos + 1)
            .filter(|id| id.bytes().all(|b| b.is_ascii_digit()))
        {
            return Some(VideoReference::VimeoVideo(id.to_string()));
        }
    }

    None
}

fn is_non_video_host(host: &str) -> bool {
    NON_VIDEO_HOSTS.contains(&host.trim_start_matches("www."))
}

fn is_short_link_host(host: Option<&str>) -> bool {
    matches!(host, Some("youtu.be") | Some("www.youtu.be"))
}

fn is_token(candidate: &str, min_len: usize) -> bool {
    candidate.len() >= min_len
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

//! URL classification for routing into the Download or YoutubeDownload
//! channel (spec §4.1, §6 "URL classification").

use url::Url;

/// Which stage-channel entrance a submitted URL should be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// Generic HTTP(S) download handled by the Download worker pool.
    Generic,
    /// Routed to the YoutubeDownload channel/worker instead.
    YouTube,
    /// A reel/short-form host served by a specialized downloader
    /// configuration — still enters the generic Download channel (spec §6:
    /// "this is a downloader concern, not a pipeline stage").
    InstagramLike,
}

const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "youtu.be",
    "youtube-nocookie.com",
    "googlevideo.com",
];

const INSTAGRAM_LIKE_HOSTS: &[&str] = &["instagram.com", "www.instagram.com", "cdninstagram.com"];

/// Classify a URL by host. Malformed URLs fall back to `Generic` — syntax
/// validation is the `UrlValidator` adapter's job (spec §4.6), not this
/// classifier's.
pub fn classify_url(raw_url: &str) -> UrlKind {
    let host = Url::parse(raw_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));

    let Some(host) = host else {
        return UrlKind::Generic;
    };

    if YOUTUBE_HOSTS.iter().any(|h| host == *h || host.ends_with(&format!(".{h}"))) {
        return UrlKind::YouTube;
    }
    if INSTAGRAM_LIKE_HOSTS
        .iter()
        .any(|h| host == *h || host.ends_with(&format!(".{h}")))
    {
        return UrlKind::InstagramLike;
    }
    UrlKind::Generic
}

/// Reel-style hosts whose 503 response maps to the non-retryable
/// `SourceProhibited` error (spec §4.3.1, §7).
pub fn is_reel_style(kind: UrlKind) -> bool {
    matches!(kind, UrlKind::InstagramLike)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_youtube_hosts() {
        assert_eq!(classify_url("https://youtube.com/watch?v=abc"), UrlKind::YouTube);
        assert_eq!(classify_url("https://www.youtube.com/watch?v=abc"), UrlKind::YouTube);
        assert_eq!(classify_url("https://youtu.be/abc"), UrlKind::YouTube);
    }

    #[test]
    fn classifies_instagram_as_reel_style() {
        let kind = classify_url("https://instagram.com/reel/abc123");
        assert_eq!(kind, UrlKind::InstagramLike);
        assert!(is_reel_style(kind));
    }

    #[test]
    fn classifies_generic_urls() {
        assert_eq!(classify_url("https://example.com/a.mp4"), UrlKind::Generic);
    }

    #[test]
    fn malformed_url_falls_back_to_generic() {
        assert_eq!(classify_url("not a url"), UrlKind::Generic);
    }
}

//! Source classification

use serde::{Deserialize, Serialize};
use url::Url;

/// MIME types that identify an HLS playlist
const HLS_MIME_TYPES: &[&str] = &[
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "audio/mpegurl",
    "audio/x-mpegurl",
];

/// What a source string refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// No source
    Empty,
    /// HLS playlist, played through the engine
    Hls,
    /// Media-source handle produced by the engine itself (`blob:`)
    MediaSourceHandle,
    /// Anything else, handed straight to the surface
    Progressive,
}

impl SourceKind {
    /// Classify a source, optionally using a MIME type hint
    pub fn classify(src: &str, type_hint: Option<&str>) -> Self {
        let src = src.trim();
        if src.is_empty() {
            return SourceKind::Empty;
        }
        if src.starts_with("blob:") {
            return SourceKind::MediaSourceHandle;
        }
        if let Some(mime) = type_hint {
            let mime = mime.split(';').next().unwrap_or("").trim();
            if HLS_MIME_TYPES.iter().any(|m| m.eq_ignore_ascii_case(mime)) {
                return SourceKind::Hls;
            }
        }

        let path = match Url::parse(src) {
            Ok(url) => url.path().to_lowercase(),
            // Relative references: strip query and fragment by hand
            Err(_) => src
                .split(['?', '#'])
                .next()
                .unwrap_or("")
                .to_lowercase(),
        };
        if path.ends_with(".m3u8") || path.ends_with(".m3u") {
            SourceKind::Hls
        } else {
            SourceKind::Progressive
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Empty => write!(f, "empty"),
            SourceKind::Hls => write!(f, "hls"),
            SourceKind::MediaSourceHandle => write!(f, "media-source"),
            SourceKind::Progressive => write!(f, "progressive"),
        }
    }
}

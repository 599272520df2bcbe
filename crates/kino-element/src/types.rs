//! Core types for Kino Element

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an attachment session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable per-rendition identifier supplied by the engine.
///
/// Only meaningful within the lifetime of one manifest; array positions are
/// never used as identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenditionId(pub String);

impl RenditionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RenditionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RenditionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RenditionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Media kinds that have a selectable track list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Whether activating one entry deactivates its siblings in a list
    pub fn is_exclusive(&self) -> bool {
        matches!(self, MediaKind::Video)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns quality tier name
    pub fn quality_name(&self) -> &'static str {
        match self.height {
            0..=240 => "240p",
            241..=360 => "360p",
            361..=480 => "480p",
            481..=720 => "720p",
            721..=1080 => "1080p",
            1081..=1440 => "1440p",
            _ => "4K",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A video level or audio rendition as reported by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rendition {
    /// Stable identifier
    pub id: RenditionId,
    /// Human-readable name (NAME attribute for alternates)
    pub name: Option<String>,
    /// Language code
    pub language: Option<String>,
    /// Bandwidth in bits per second
    pub bandwidth: u64,
    /// Video resolution (levels only)
    pub resolution: Option<Resolution>,
    /// Codec string
    pub codecs: Option<String>,
    /// Audio group (alternates only)
    pub group_id: Option<String>,
    /// Channel layout (audio only)
    pub channels: Option<String>,
    /// DEFAULT flag from the manifest
    pub default: bool,
}

impl Rendition {
    /// Create a bare rendition with only an identifier
    pub fn new(id: impl Into<RenditionId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            language: None,
            bandwidth: 0,
            resolution: None,
            codecs: None,
            group_id: None,
            channels: None,
            default: false,
        }
    }

    /// Create a video level
    pub fn level(id: impl Into<RenditionId>, resolution: Resolution, bandwidth: u64) -> Self {
        Self {
            resolution: Some(resolution),
            bandwidth,
            ..Self::new(id)
        }
    }

    /// Create an audio rendition
    pub fn audio(
        id: impl Into<RenditionId>,
        name: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            language: Some(language.into()),
            ..Self::new(id)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Label shown in track lists: the name, else `<quality>@<bitrate>`
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match self.resolution {
            Some(res) if self.bandwidth > 0 => {
                format!("{}@{}", res.quality_name(), format_bitrate(self.bandwidth))
            }
            Some(res) => res.quality_name().to_string(),
            None if self.bandwidth > 0 => format_bitrate(self.bandwidth),
            None => self.id.to_string(),
        }
    }
}

/// Format a bitrate as `2Mbps`, `1.5Mbps` or `800kbps`
pub fn format_bitrate(bps: u64) -> String {
    if bps >= 1_000_000 {
        let mbps = bps as f64 / 1_000_000.0;
        if (mbps.fract()).abs() < f64::EPSILON {
            format!("{}Mbps", mbps as u64)
        } else {
            format!("{:.1}Mbps", mbps)
        }
    } else {
        format!("{}kbps", bps / 1000)
    }
}

/// Text track type (captions, subtitles, descriptions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextTrackKind {
    /// Closed captions (includes speaker identification, sound effects)
    Captions,
    /// Subtitles (dialogue translation)
    Subtitles,
    /// Audio descriptions for visually impaired
    Descriptions,
    /// Chapter titles
    Chapters,
    /// Metadata track
    Metadata,
}

impl TextTrackKind {
    /// Parse an engine or track kind string, ignoring case.
    ///
    /// `CLOSED-CAPTIONS` (the HLS media type) maps to captions.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "captions" | "closed-captions" => Some(TextTrackKind::Captions),
            "subtitles" => Some(TextTrackKind::Subtitles),
            "descriptions" => Some(TextTrackKind::Descriptions),
            "chapters" => Some(TextTrackKind::Chapters),
            "metadata" => Some(TextTrackKind::Metadata),
            _ => None,
        }
    }
}

impl std::fmt::Display for TextTrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextTrackKind::Captions => write!(f, "captions"),
            TextTrackKind::Subtitles => write!(f, "subtitles"),
            TextTrackKind::Descriptions => write!(f, "descriptions"),
            TextTrackKind::Chapters => write!(f, "chapters"),
            TextTrackKind::Metadata => write!(f, "metadata"),
        }
    }
}

/// A subtitle or caption rendition as reported by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleRendition {
    /// Stable identifier
    pub id: RenditionId,
    /// Track kind (from the engine's type string)
    pub kind: TextTrackKind,
    /// NAME attribute
    pub name: String,
    /// Language code
    pub language: Option<String>,
    /// DEFAULT flag
    pub default: bool,
    /// FORCED flag
    pub forced: bool,
}

impl SubtitleRendition {
    pub fn new(
        id: impl Into<RenditionId>,
        kind: TextTrackKind,
        name: impl Into<String>,
        language: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            language: language.map(str::to_string),
            default: false,
            forced: false,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }
}

/// A parsed caption cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCue {
    /// Cue identifier (optional in WebVTT)
    pub id: Option<String>,
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds
    pub end_time: f64,
    /// Cue payload
    pub text: String,
}

impl TextCue {
    pub fn new(start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            id: None,
            start_time,
            end_time,
            text: text.into(),
        }
    }

    /// Same timing and payload; the id is not part of cue identity
    pub fn is_duplicate_of(&self, other: &TextCue) -> bool {
        self.start_time == other.start_time
            && self.end_time == other.end_time
            && self.text == other.text
    }
}

/// Normalized time ranges (seconds), as exposed by a playback surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRanges {
    ranges: Vec<(f64, f64)>,
}

impl TimeRanges {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A single contiguous range
    pub fn single(start: f64, end: f64) -> Self {
        Self {
            ranges: vec![(start, end.max(start))],
        }
    }

    pub fn from_ranges(ranges: Vec<(f64, f64)>) -> Self {
        Self { ranges }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn start(&self, index: usize) -> Option<f64> {
        self.ranges.get(index).map(|r| r.0)
    }

    pub fn end(&self, index: usize) -> Option<f64> {
        self.ranges.get(index).map(|r| r.1)
    }

    /// Check whether a time falls within any range
    pub fn contains(&self, time: f64) -> bool {
        self.ranges.iter().any(|&(s, e)| time >= s && time <= e)
    }

    /// Clamp a time into the covering span of all ranges
    pub fn clamp(&self, time: f64) -> f64 {
        match (self.ranges.first(), self.ranges.last()) {
            (Some(first), Some(last)) => time.clamp(first.0, last.1),
            _ => time,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.ranges.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendition_label() {
        let level = Rendition::level("v0", Resolution::new(854, 480), 1_000_000);
        assert_eq!(level.label(), "480p@1Mbps");

        let level = Rendition::level("v1", Resolution::new(1280, 720), 2_500_000);
        assert_eq!(level.label(), "720p@2.5Mbps");

        let audio = Rendition::audio("a0", "English", "en");
        assert_eq!(audio.label(), "English");

        assert_eq!(Rendition::new("bare").label(), "bare");
    }

    #[test]
    fn test_format_bitrate() {
        assert_eq!(format_bitrate(800_000), "800kbps");
        assert_eq!(format_bitrate(2_000_000), "2Mbps");
    }

    #[test]
    fn test_text_track_kind_parse() {
        assert_eq!(TextTrackKind::parse("SUBTITLES"), Some(TextTrackKind::Subtitles));
        assert_eq!(TextTrackKind::parse("Closed-Captions"), Some(TextTrackKind::Captions));
        assert_eq!(TextTrackKind::parse("captions"), Some(TextTrackKind::Captions));
        assert_eq!(TextTrackKind::parse("karaoke"), None);
    }

    #[test]
    fn test_cue_duplicate_ignores_id() {
        let a = TextCue::new(1.0, 2.0, "Hi");
        let mut b = TextCue::new(1.0, 2.0, "Hi");
        b.id = Some("cue-7".to_string());
        assert!(a.is_duplicate_of(&b));
        assert!(!a.is_duplicate_of(&TextCue::new(1.0, 2.5, "Hi")));
    }

    #[test]
    fn test_time_ranges() {
        let ranges = TimeRanges::single(10.0, 40.0);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges.start(0), Some(10.0));
        assert_eq!(ranges.end(0), Some(40.0));
        assert!(ranges.contains(20.0));
        assert!(!ranges.contains(50.0));
        assert_eq!(ranges.clamp(50.0), 40.0);
        assert_eq!(ranges.clamp(0.0), 10.0);
        assert_eq!(TimeRanges::empty().clamp(5.0), 5.0);
        assert_eq!(TimeRanges::single(5.0, 1.0).end(0), Some(5.0));
    }
}

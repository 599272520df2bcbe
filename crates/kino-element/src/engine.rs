//! Adaptive streaming engine boundary
//!
//! The engine (manifest loading, segment fetching, ABR) is opaque. This
//! module defines what the element needs from it: an ordered event stream,
//! rendition arrays, current-rendition indices and a few commands.

use crate::config::EngineConfig;
use crate::types::{Rendition, RenditionId, SubtitleRendition, TextCue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};

/// Events emitted by an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Engine bound itself to the surface
    MediaAttached,
    /// Engine is about to unbind from the surface
    MediaDetaching,
    /// Master playlist parsed; video levels known
    ManifestParsed { levels: Vec<Rendition> },
    /// Active video level changed
    LevelSwitched { id: RenditionId },
    /// Audio renditions (re)discovered
    AudioTracksUpdated { tracks: Vec<Rendition> },
    /// Active audio rendition changed
    AudioTrackSwitched { id: RenditionId },
    /// Subtitle renditions (re)discovered
    SubtitleTracksUpdated { tracks: Vec<SubtitleRendition> },
    /// Active subtitle rendition changed; `None` means subtitles off
    SubtitleTrackSwitched { id: Option<RenditionId> },
    /// Cues parsed for the active subtitle rendition
    CuesParsed { cues: Vec<TextCue> },
    /// Engine error
    Error { details: String, fatal: bool },
}

impl EngineEvent {
    pub fn kind(&self) -> EngineEventKind {
        match self {
            EngineEvent::MediaAttached => EngineEventKind::MediaAttached,
            EngineEvent::MediaDetaching => EngineEventKind::MediaDetaching,
            EngineEvent::ManifestParsed { .. } => EngineEventKind::ManifestParsed,
            EngineEvent::LevelSwitched { .. } => EngineEventKind::LevelSwitched,
            EngineEvent::AudioTracksUpdated { .. } => EngineEventKind::AudioTracksUpdated,
            EngineEvent::AudioTrackSwitched { .. } => EngineEventKind::AudioTrackSwitched,
            EngineEvent::SubtitleTracksUpdated { .. } => EngineEventKind::SubtitleTracksUpdated,
            EngineEvent::SubtitleTrackSwitched { .. } => EngineEventKind::SubtitleTrackSwitched,
            EngineEvent::CuesParsed { .. } => EngineEventKind::CuesParsed,
            EngineEvent::Error { .. } => EngineEventKind::Error,
        }
    }
}

/// Event names used to key subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineEventKind {
    MediaAttached,
    MediaDetaching,
    ManifestParsed,
    LevelSwitched,
    AudioTracksUpdated,
    AudioTrackSwitched,
    SubtitleTracksUpdated,
    SubtitleTrackSwitched,
    CuesParsed,
    Error,
}

impl EngineEventKind {
    /// Every event kind
    pub const ALL: [EngineEventKind; 10] = [
        EngineEventKind::MediaAttached,
        EngineEventKind::MediaDetaching,
        EngineEventKind::ManifestParsed,
        EngineEventKind::LevelSwitched,
        EngineEventKind::AudioTracksUpdated,
        EngineEventKind::AudioTrackSwitched,
        EngineEventKind::SubtitleTracksUpdated,
        EngineEventKind::SubtitleTrackSwitched,
        EngineEventKind::CuesParsed,
        EngineEventKind::Error,
    ];
}

/// Identifies one subscription on one engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Receiving end of an engine subscription.
///
/// One subscription covers a set of event kinds over a single channel so
/// events arrive in emission order.
#[derive(Debug)]
pub struct EngineSubscription {
    id: SubscriptionId,
    kinds: HashSet<EngineEventKind>,
    rx: UnboundedReceiver<EngineEvent>,
}

impl EngineSubscription {
    pub fn new(
        id: SubscriptionId,
        kinds: &[EngineEventKind],
        rx: UnboundedReceiver<EngineEvent>,
    ) -> Self {
        Self {
            id,
            kinds: kinds.iter().copied().collect(),
            rx,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn covers(&self, kind: EngineEventKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Next queued event, if any
    pub fn try_next(&mut self) -> Option<EngineEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Sliding window reported by the engine for the active playlist
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveWindow {
    /// Earliest available media time
    pub start: f64,
    /// Latest available media time
    pub end: f64,
    /// Live or event playlist (no ENDLIST yet)
    pub live: bool,
    /// Engine's recommended live playback position, if computed
    pub live_sync_position: Option<f64>,
    /// Target segment duration in seconds
    pub target_duration: f64,
}

/// An adaptive streaming engine instance
pub trait AdaptiveEngine {
    /// Subscribe to a set of event kinds
    fn subscribe(&mut self, kinds: &[EngineEventKind]) -> EngineSubscription;

    /// Cancel a subscription; unknown ids are ignored
    fn unsubscribe(&mut self, id: SubscriptionId);

    /// Video levels of the current manifest
    fn levels(&self) -> &[Rendition];

    /// Index of the active level
    fn current_level(&self) -> Option<usize>;

    fn set_current_level(&mut self, index: usize);

    /// Audio renditions of the current manifest
    fn audio_tracks(&self) -> &[Rendition];

    fn audio_track(&self) -> Option<usize>;

    fn set_audio_track(&mut self, index: usize);

    /// Subtitle renditions of the current manifest
    fn subtitle_tracks(&self) -> &[SubtitleRendition];

    fn subtitle_track(&self) -> Option<usize>;

    /// `None` turns subtitles off
    fn set_subtitle_track(&mut self, index: Option<usize>);

    /// Begin loading a manifest
    fn load_source(&mut self, src: &str);

    /// Bind to the playback surface
    fn attach_media(&mut self);

    fn detach_media(&mut self);

    /// Whether the engine is currently bound to the surface
    fn media_attached(&self) -> bool;

    /// Release every resource; the instance is unusable afterwards
    fn destroy(&mut self);

    /// Window of the active playlist, once one is loaded
    fn live_window(&self) -> Option<LiveWindow>;

    /// Program date of media time zero, if the playlist carries one
    fn start_date(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// The active subtitle rendition
    fn active_subtitle(&self) -> Option<&SubtitleRendition> {
        self.subtitle_track()
            .and_then(|index| self.subtitle_tracks().get(index))
    }
}

/// Constructs engine instances; injected into the element
pub trait EngineFactory {
    fn create(&self, config: &EngineConfig) -> Box<dyn AdaptiveEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn(&EngineConfig) -> Box<dyn AdaptiveEngine>,
{
    fn create(&self, config: &EngineConfig) -> Box<dyn AdaptiveEngine> {
        self(config)
    }
}

//! HLS media element - attachment lifecycle controller
//!
//! Coordinates:
//! - Source classification and engine creation
//! - Track-list binding for video and audio
//! - Subtitle placeholders and cue delivery
//! - Ordered dispatch of engine events and list notifications
//! - Idempotent teardown

use crate::{
    config::{ElementConfig, PlaybackPreference},
    engine::{AdaptiveEngine, EngineEvent, EngineEventKind, EngineFactory, EngineSubscription, SubscriptionId},
    seekable::seekable_ranges,
    source::SourceKind,
    subtitles::SubtitleBridge,
    surface::PlaybackSurface,
    sync::{active_rendition_id, RenditionSync},
    tracks::{AudioTrack, SharedTextTracks, SharedTrackList, VideoTrack},
    types::{MediaKind, SessionId, TimeRanges},
    Error, Result,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

/// Attachment lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachmentState {
    /// No engine session
    Detached,
    /// Binding lists and creating the engine
    Attaching,
    /// Engine session live
    Attached,
    /// Tearing the session down
    Detaching,
}

impl AttachmentState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: AttachmentState) -> bool {
        use AttachmentState::*;
        matches!(
            (self, target),
            (Detached, Attaching)
                | (Attaching, Attached)
                | (Attaching, Detaching)
                | (Attached, Detaching)
                | (Detaching, Detached)
        )
    }
}

impl std::fmt::Display for AttachmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttachmentState::Detached => write!(f, "detached"),
            AttachmentState::Attaching => write!(f, "attaching"),
            AttachmentState::Attached => write!(f, "attached"),
            AttachmentState::Detaching => write!(f, "detaching"),
        }
    }
}

/// One surface + one source + one engine instance
struct Session {
    id: SessionId,
    src: String,
    engine: Box<dyn AdaptiveEngine>,
    /// Cleared when the engine announces it is detaching
    media_attached: bool,
    events: EngineSubscription,
    /// Every engine subscription made for this session
    subscriptions: Vec<SubscriptionId>,
}

/// A playback surface driven by an adaptive streaming engine for HLS
/// sources, with its video/audio/text track lists kept in sync.
pub struct HlsMediaElement<S: PlaybackSurface> {
    /// Native surface
    surface: S,
    /// Element configuration
    config: ElementConfig,
    /// Injected engine implementation
    factory: Option<Box<dyn EngineFactory>>,
    /// Lifecycle state
    state: AttachmentState,
    /// Live engine session, if any
    session: Option<Session>,
    /// Video levels <-> video track list
    video: RenditionSync<VideoTrack>,
    /// Audio renditions <-> audio track list
    audio: RenditionSync<AudioTrack>,
    /// Subtitle renditions <-> text tracks
    subtitles: SubtitleBridge,
    /// MIME type hint for the next source
    type_hint: Option<String>,
    /// Last engine error reported
    last_error: Option<String>,
}

impl<S: PlaybackSurface> HlsMediaElement<S> {
    /// Create an element with default configuration and no engine
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            config: ElementConfig::default(),
            factory: None,
            state: AttachmentState::Detached,
            session: None,
            video: RenditionSync::new(),
            audio: RenditionSync::new(),
            subtitles: SubtitleBridge::new(),
            type_hint: None,
            last_error: None,
        }
    }

    pub fn with_config(mut self, config: ElementConfig) -> Self {
        self.config = config;
        self
    }

    /// Supply the engine implementation used for HLS sources
    pub fn with_engine_factory(mut self, factory: impl EngineFactory + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    pub fn set_engine_factory(&mut self, factory: impl EngineFactory + 'static) {
        self.factory = Some(Box::new(factory));
    }

    pub fn config(&self) -> &ElementConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn state(&self) -> AttachmentState {
        self.state
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// MIME type hint used when classifying the next source
    pub fn set_type_hint(&mut self, mime: Option<&str>) {
        self.type_hint = mime.map(str::to_string);
    }

    /// Transition to new state
    fn set_state(&mut self, new_state: AttachmentState) {
        let current = self.state;
        if !current.can_transition_to(new_state) {
            warn!(from = %current, to = %new_state, "Unexpected attachment transition");
        }
        self.state = new_state;
        debug!(from = %current, to = %new_state, "Attachment transition");
    }

    /// Current source: the session's playlist URL, else the surface's source
    pub fn src(&self) -> Option<String> {
        match &self.session {
            Some(session) => Some(session.src.clone()),
            None => self.surface.src(),
        }
    }

    /// Set the source.
    ///
    /// HLS sources start a new engine session; an empty source tears down
    /// and clears the surface; anything else is handed to the surface.
    #[instrument(skip(self))]
    pub fn set_src(&mut self, src: &str) -> Result<()> {
        let kind = SourceKind::classify(src, self.type_hint.as_deref());
        info!(kind = %kind, "Setting source");

        match kind {
            SourceKind::Empty => {
                self.detach();
                self.surface.set_src(None);
            }
            SourceKind::Hls if self.plays_natively() => {
                self.detach();
                self.surface.set_src(Some(src));
            }
            SourceKind::Hls => self.attach(src)?,
            // Produced by the engine for its own session
            SourceKind::MediaSourceHandle => self.surface.set_src(Some(src)),
            SourceKind::Progressive => {
                self.detach();
                self.surface.set_src(Some(src));
            }
        }
        Ok(())
    }

    fn plays_natively(&self) -> bool {
        self.config.preference == PlaybackPreference::Native && self.surface.supports_native_hls()
    }

    /// Start a new engine session for an HLS source
    fn attach(&mut self, src: &str) -> Result<()> {
        let factory = self.factory.take().ok_or_else(|| Error::EngineUnavailable {
            src: src.to_string(),
        })?;

        self.detach();
        self.set_state(AttachmentState::Attaching);

        self.video.bind(&mut self.surface);
        self.audio.bind(&mut self.surface);
        self.subtitles.bind(self.surface.text_tracks());

        let mut engine = factory.create(&self.config.engine);
        self.factory = Some(factory);

        let events = engine.subscribe(&EngineEventKind::ALL);
        let subscriptions = vec![events.id()];

        engine.load_source(src);
        engine.attach_media();

        let id = SessionId::new();
        self.session = Some(Session {
            id,
            src: src.to_string(),
            engine,
            media_attached: true,
            events,
            subscriptions,
        });
        self.last_error = None;
        self.set_state(AttachmentState::Attached);

        info!(session_id = %id, src = %src, "Engine session attached");
        Ok(())
    }

    /// Tear down the current session. Safe to call at any time.
    #[instrument(skip(self))]
    pub fn detach(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        self.set_state(AttachmentState::Detaching);

        self.subtitles.teardown();
        self.video.teardown();
        self.audio.teardown();

        for id in session.subscriptions.drain(..) {
            session.engine.unsubscribe(id);
        }
        session.engine.detach_media();
        session.engine.destroy();

        self.set_state(AttachmentState::Detached);
        info!(session_id = %session.id, src = %session.src, "Engine session detached");
    }

    /// Process queued list notifications and engine events until quiet.
    ///
    /// Returns the number of notifications and events handled.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;

        for _ in 0..self.config.max_dispatch_rounds {
            let mut progressed = false;

            // User-driven changes first so they are not overwritten by
            // engine events queued before them
            if self.video.take_selection_change() {
                progressed = true;
                handled += 1;
                if let Some(session) = self.session.as_mut() {
                    self.video.on_user_selection_changed(session.engine.as_mut());
                }
            }
            if self.audio.take_selection_change() {
                progressed = true;
                handled += 1;
                if let Some(session) = self.session.as_mut() {
                    self.audio.on_user_selection_changed(session.engine.as_mut());
                }
            }
            if self.subtitles.take_mode_change() {
                progressed = true;
                handled += 1;
                if let Some(session) = self.session.as_mut() {
                    self.subtitles.on_user_text_track_changed(session.engine.as_mut());
                }
            }

            while let Some(event) = self.session.as_mut().and_then(|s| s.events.try_next()) {
                self.handle_engine_event(event);
                progressed = true;
                handled += 1;
            }

            if !progressed {
                return handled;
            }
        }

        warn!(
            rounds = self.config.max_dispatch_rounds,
            "Dispatch round limit reached with work still pending"
        );
        handled
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let engine = session.engine.as_mut();

        match event {
            EngineEvent::MediaAttached => {
                session.media_attached = true;
                debug!(session_id = %session.id, "Engine attached to media");
            }
            EngineEvent::MediaDetaching => {
                session.media_attached = false;
                debug!(session_id = %session.id, "Engine detaching from media");
            }
            EngineEvent::ManifestParsed { levels } => {
                let active = active_rendition_id(MediaKind::Video, engine);
                self.video.on_manifest_ready(&levels, active.as_ref());
                info!(levels = levels.len(), "Manifest parsed");
            }
            EngineEvent::LevelSwitched { id } => {
                self.video.on_engine_rendition_switched(&id);
            }
            EngineEvent::AudioTracksUpdated { tracks } => {
                let active = active_rendition_id(MediaKind::Audio, engine);
                self.audio.on_manifest_ready(&tracks, active.as_ref());
            }
            EngineEvent::AudioTrackSwitched { id } => {
                self.audio.on_engine_rendition_switched(&id);
            }
            EngineEvent::SubtitleTracksUpdated { tracks } => {
                self.subtitles.on_subtitle_renditions_discovered(&tracks);
            }
            EngineEvent::SubtitleTrackSwitched { id } => {
                let active = id.and_then(|id| {
                    engine
                        .subtitle_tracks()
                        .iter()
                        .find(|r| r.id == id)
                        .cloned()
                });
                self.subtitles.on_engine_subtitle_switched(active.as_ref());
            }
            EngineEvent::CuesParsed { cues } => {
                let active = engine.active_subtitle().cloned();
                let added = self.subtitles.on_cues_parsed(active.as_ref(), &cues);
                debug!(parsed = cues.len(), added, "Cues delivered");
            }
            EngineEvent::Error { details, fatal } => {
                if fatal {
                    error!(session_id = %session.id, details = %details, "Fatal engine error");
                } else {
                    warn!(session_id = %session.id, details = %details, "Engine error");
                }
                self.last_error = Some(details);
            }
        }
    }

    /// The session's engine, only while it is attached to this surface
    pub fn engine(&self) -> Option<&dyn AdaptiveEngine> {
        self.session
            .as_ref()
            .filter(|s| s.media_attached && s.engine.media_attached())
            .map(|s| s.engine.as_ref())
    }

    /// Seekable ranges, derived from the engine while a session is live
    pub fn seekable(&self) -> TimeRanges {
        let window = self.session.as_ref().and_then(|s| s.engine.live_window());
        seekable_ranges(
            window.as_ref(),
            || self.surface.native_seekable(),
            self.config.engine.live_sync_duration_count,
        )
    }

    /// Program date of media time zero
    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        match &self.session {
            Some(session) => session.engine.start_date(),
            None => self.surface.native_start_date(),
        }
    }

    pub fn current_time(&self) -> f64 {
        self.surface.current_time()
    }

    /// Seek; clamped into the seekable view while a session is live
    pub fn set_current_time(&mut self, time: f64) {
        let time = if self.session.is_some() {
            self.seekable().clamp(time)
        } else {
            time
        };
        self.surface.set_current_time(time);
    }

    /// Video track list in use (or last used)
    pub fn video_tracks(&self) -> Option<SharedTrackList<VideoTrack>> {
        self.video.list()
    }

    /// Audio track list in use (or last used)
    pub fn audio_tracks(&self) -> Option<SharedTrackList<AudioTrack>> {
        self.audio.list()
    }

    pub fn text_tracks(&self) -> SharedTextTracks {
        self.surface.text_tracks()
    }

    /// Number of subtitle placeholders the current session created
    pub fn placeholder_count(&self) -> usize {
        self.subtitles.placeholder_count()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl<S: PlaybackSurface> Drop for HlsMediaElement<S> {
    fn drop(&mut self) {
        self.detach();
    }
}

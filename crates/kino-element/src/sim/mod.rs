//! In-memory reference engine and surface
//!
//! `ScriptedEngine` plays back a fixed manifest and lets the caller decide
//! when events fire through a `ScriptedEngineHandle`. `MemorySurface` is a
//! playback surface with no decoder behind it.

mod playlist;

use crate::config::EngineConfig;
use crate::engine::{
    AdaptiveEngine, EngineEvent, EngineEventKind, EngineFactory, EngineSubscription, LiveWindow,
    SubscriptionId,
};
use crate::surface::{PlaybackSurface, TrackListHost};
use crate::tracks::{AudioTrack, SharedTextTracks, SharedTrackList, TextTrackList, VideoTrack};
use crate::types::{Rendition, SubtitleRendition, TimeRanges};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::trace;

/// Manifest and initial state a scripted engine plays back
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineScript {
    pub levels: Vec<Rendition>,
    pub audio_tracks: Vec<Rendition>,
    pub subtitle_tracks: Vec<SubtitleRendition>,
    pub initial_level: Option<usize>,
    pub initial_audio_track: Option<usize>,
    pub initial_subtitle_track: Option<usize>,
    /// Window reported once the manifest is loaded
    pub live_window: Option<LiveWindow>,
    pub start_date: Option<DateTime<Utc>>,
}

/// Commands the engine received, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineCommand {
    LoadSource(String),
    AttachMedia,
    DetachMedia,
    SetLevel(usize),
    SetAudioTrack(usize),
    SetSubtitleTrack(Option<usize>),
    Destroy,
}

struct Subscriber {
    id: SubscriptionId,
    kinds: HashSet<EngineEventKind>,
    tx: UnboundedSender<EngineEvent>,
}

struct EngineState {
    config: EngineConfig,
    subscribers: Vec<Subscriber>,
    next_subscription: u64,
    commands: Vec<EngineCommand>,
    current_level: Option<usize>,
    audio_track: Option<usize>,
    subtitle_track: Option<usize>,
    source: Option<String>,
    media_attached: bool,
    manifest_loaded: bool,
    live_window: Option<LiveWindow>,
    destroyed: bool,
}

impl EngineState {
    fn emit(&mut self, event: EngineEvent) {
        let kind = event.kind();
        trace!(?kind, subscribers = self.subscribers.len(), "Scripted engine event");
        self.subscribers
            .retain(|s| !s.kinds.contains(&kind) || s.tx.send(event.clone()).is_ok());
    }
}

/// Scripted adaptive engine
pub struct ScriptedEngine {
    script: Rc<EngineScript>,
    state: Rc<RefCell<EngineState>>,
}

impl ScriptedEngine {
    pub fn new(script: EngineScript) -> Self {
        Self::with_config(script, EngineConfig::default())
    }

    pub fn with_config(script: EngineScript, config: EngineConfig) -> Self {
        let state = EngineState {
            config,
            subscribers: Vec::new(),
            next_subscription: 1,
            commands: Vec::new(),
            current_level: script.initial_level,
            audio_track: script.initial_audio_track,
            subtitle_track: script.initial_subtitle_track,
            source: None,
            media_attached: false,
            manifest_loaded: false,
            live_window: None,
            destroyed: false,
        };
        Self {
            script: Rc::new(script),
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Control handle that outlives boxing the engine
    pub fn handle(&self) -> ScriptedEngineHandle {
        ScriptedEngineHandle {
            script: self.script.clone(),
            state: self.state.clone(),
        }
    }

    fn record(&self, command: EngineCommand) {
        self.state.borrow_mut().commands.push(command);
    }
}

impl AdaptiveEngine for ScriptedEngine {
    fn subscribe(&mut self, kinds: &[EngineEventKind]) -> EngineSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.borrow_mut();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.subscribers.push(Subscriber {
            id,
            kinds: kinds.iter().copied().collect(),
            tx,
        });
        EngineSubscription::new(id, kinds, rx)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.state.borrow_mut().subscribers.retain(|s| s.id != id);
    }

    fn levels(&self) -> &[Rendition] {
        &self.script.levels
    }

    fn current_level(&self) -> Option<usize> {
        self.state.borrow().current_level
    }

    fn set_current_level(&mut self, index: usize) {
        self.record(EngineCommand::SetLevel(index));
        if let Some(level) = self.script.levels.get(index) {
            let mut state = self.state.borrow_mut();
            state.current_level = Some(index);
            state.emit(EngineEvent::LevelSwitched {
                id: level.id.clone(),
            });
        }
    }

    fn audio_tracks(&self) -> &[Rendition] {
        &self.script.audio_tracks
    }

    fn audio_track(&self) -> Option<usize> {
        self.state.borrow().audio_track
    }

    fn set_audio_track(&mut self, index: usize) {
        self.record(EngineCommand::SetAudioTrack(index));
        if let Some(track) = self.script.audio_tracks.get(index) {
            let mut state = self.state.borrow_mut();
            state.audio_track = Some(index);
            state.emit(EngineEvent::AudioTrackSwitched {
                id: track.id.clone(),
            });
        }
    }

    fn subtitle_tracks(&self) -> &[SubtitleRendition] {
        &self.script.subtitle_tracks
    }

    fn subtitle_track(&self) -> Option<usize> {
        self.state.borrow().subtitle_track
    }

    fn set_subtitle_track(&mut self, index: Option<usize>) {
        self.record(EngineCommand::SetSubtitleTrack(index));
        let id = match index {
            Some(i) => match self.script.subtitle_tracks.get(i) {
                Some(rendition) => Some(rendition.id.clone()),
                None => return,
            },
            None => None,
        };
        let mut state = self.state.borrow_mut();
        state.subtitle_track = index;
        state.emit(EngineEvent::SubtitleTrackSwitched { id });
    }

    fn load_source(&mut self, src: &str) {
        self.record(EngineCommand::LoadSource(src.to_string()));
        self.state.borrow_mut().source = Some(src.to_string());
    }

    fn attach_media(&mut self) {
        self.record(EngineCommand::AttachMedia);
        let mut state = self.state.borrow_mut();
        state.media_attached = true;
        state.emit(EngineEvent::MediaAttached);
    }

    fn detach_media(&mut self) {
        self.record(EngineCommand::DetachMedia);
        let mut state = self.state.borrow_mut();
        if state.media_attached {
            state.emit(EngineEvent::MediaDetaching);
            state.media_attached = false;
        }
    }

    fn media_attached(&self) -> bool {
        self.state.borrow().media_attached
    }

    fn destroy(&mut self) {
        self.record(EngineCommand::Destroy);
        let mut state = self.state.borrow_mut();
        state.subscribers.clear();
        state.media_attached = false;
        state.destroyed = true;
    }

    fn live_window(&self) -> Option<LiveWindow> {
        self.state.borrow().live_window
    }

    fn start_date(&self) -> Option<DateTime<Utc>> {
        self.script.start_date
    }
}

/// Drives a `ScriptedEngine` from the outside
#[derive(Clone)]
pub struct ScriptedEngineHandle {
    script: Rc<EngineScript>,
    state: Rc<RefCell<EngineState>>,
}

impl ScriptedEngineHandle {
    /// Finish loading the manifest: announce renditions, then the
    /// initially active ones.
    pub fn complete_manifest_load(&self) {
        let script = &self.script;
        let mut state = self.state.borrow_mut();
        if state.destroyed {
            return;
        }
        state.manifest_loaded = true;
        state.live_window = script.live_window;

        state.emit(EngineEvent::ManifestParsed {
            levels: script.levels.clone(),
        });
        if !script.audio_tracks.is_empty() {
            state.emit(EngineEvent::AudioTracksUpdated {
                tracks: script.audio_tracks.clone(),
            });
        }
        if !script.subtitle_tracks.is_empty() {
            state.emit(EngineEvent::SubtitleTracksUpdated {
                tracks: script.subtitle_tracks.clone(),
            });
        }

        if let Some(level) = state.current_level.and_then(|i| script.levels.get(i)) {
            let id = level.id.clone();
            state.emit(EngineEvent::LevelSwitched { id });
        }
        if let Some(track) = state.audio_track.and_then(|i| script.audio_tracks.get(i)) {
            let id = track.id.clone();
            state.emit(EngineEvent::AudioTrackSwitched { id });
        }
        if let Some(track) = state.subtitle_track.and_then(|i| script.subtitle_tracks.get(i)) {
            let id = Some(track.id.clone());
            state.emit(EngineEvent::SubtitleTrackSwitched { id });
        }
    }

    /// Emit an arbitrary event to matching subscribers
    pub fn emit(&self, event: EngineEvent) {
        self.state.borrow_mut().emit(event);
    }

    /// Engine-initiated level switch (ABR)
    pub fn switch_level(&self, index: usize) {
        let Some(level) = self.script.levels.get(index) else {
            return;
        };
        let mut state = self.state.borrow_mut();
        state.current_level = Some(index);
        state.emit(EngineEvent::LevelSwitched {
            id: level.id.clone(),
        });
    }

    pub fn set_live_window(&self, window: Option<LiveWindow>) {
        self.state.borrow_mut().live_window = window;
    }

    pub fn commands(&self) -> Vec<EngineCommand> {
        self.state.borrow().commands.clone()
    }

    pub fn config(&self) -> EngineConfig {
        self.state.borrow().config.clone()
    }

    pub fn source(&self) -> Option<String> {
        self.state.borrow().source.clone()
    }

    pub fn current_level(&self) -> Option<usize> {
        self.state.borrow().current_level
    }

    pub fn audio_track(&self) -> Option<usize> {
        self.state.borrow().audio_track
    }

    pub fn subtitle_track(&self) -> Option<usize> {
        self.state.borrow().subtitle_track
    }

    pub fn media_attached(&self) -> bool {
        self.state.borrow().media_attached
    }

    pub fn manifest_loaded(&self) -> bool {
        self.state.borrow().manifest_loaded
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }

    /// Live subscriptions on the engine
    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }
}

/// Creates scripted engines and keeps a handle to each
#[derive(Clone)]
pub struct ScriptedEngineFactory {
    script: EngineScript,
    created: Rc<RefCell<Vec<ScriptedEngineHandle>>>,
}

impl ScriptedEngineFactory {
    pub fn new(script: EngineScript) -> Self {
        Self {
            script,
            created: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Handle of the most recently created engine
    pub fn latest(&self) -> Option<ScriptedEngineHandle> {
        self.created.borrow().last().cloned()
    }

    /// Handles of every engine created so far
    pub fn handles(&self) -> Vec<ScriptedEngineHandle> {
        self.created.borrow().clone()
    }
}

impl EngineFactory for ScriptedEngineFactory {
    fn create(&self, config: &EngineConfig) -> Box<dyn AdaptiveEngine> {
        let engine = ScriptedEngine::with_config(self.script.clone(), config.clone());
        self.created.borrow_mut().push(engine.handle());
        Box::new(engine)
    }
}

#[derive(Default)]
struct MemoryTrackHost {
    video: Option<SharedTrackList<VideoTrack>>,
    audio: Option<SharedTrackList<AudioTrack>>,
}

impl TrackListHost for MemoryTrackHost {
    fn video_tracks(&self) -> Option<SharedTrackList<VideoTrack>> {
        self.video.clone()
    }

    fn set_video_tracks(&mut self, list: SharedTrackList<VideoTrack>) {
        self.video = Some(list);
    }

    fn audio_tracks(&self) -> Option<SharedTrackList<AudioTrack>> {
        self.audio.clone()
    }

    fn set_audio_tracks(&mut self, list: SharedTrackList<AudioTrack>) {
        self.audio = Some(list);
    }
}

/// Playback surface held entirely in memory
pub struct MemorySurface {
    current_time: f64,
    src: Option<String>,
    native_seekable: TimeRanges,
    native_start_date: Option<DateTime<Utc>>,
    native_hls: bool,
    text_tracks: SharedTextTracks,
    host: Option<MemoryTrackHost>,
}

impl MemorySurface {
    /// Surface able to advertise video/audio track lists
    pub fn new() -> Self {
        Self {
            current_time: 0.0,
            src: None,
            native_seekable: TimeRanges::empty(),
            native_start_date: None,
            native_hls: false,
            text_tracks: TextTrackList::shared(),
            host: Some(MemoryTrackHost::default()),
        }
    }

    /// Surface without the track-list host capability
    pub fn without_track_host() -> Self {
        Self {
            host: None,
            ..Self::new()
        }
    }

    pub fn with_native_hls(mut self) -> Self {
        self.native_hls = true;
        self
    }

    pub fn set_native_seekable(&mut self, ranges: TimeRanges) {
        self.native_seekable = ranges;
    }

    pub fn set_native_start_date(&mut self, date: Option<DateTime<Utc>>) {
        self.native_start_date = date;
    }

    pub fn video_track_list(&self) -> Option<SharedTrackList<VideoTrack>> {
        self.host.as_ref().and_then(|h| h.video.clone())
    }

    pub fn audio_track_list(&self) -> Option<SharedTrackList<AudioTrack>> {
        self.host.as_ref().and_then(|h| h.audio.clone())
    }

    /// Advertise a list owned by someone else; ignored without a host
    pub fn advertise_video_tracks(&mut self, list: SharedTrackList<VideoTrack>) {
        if let Some(host) = self.host.as_mut() {
            host.set_video_tracks(list);
        }
    }

    pub fn advertise_audio_tracks(&mut self, list: SharedTrackList<AudioTrack>) {
        if let Some(host) = self.host.as_mut() {
            host.set_audio_tracks(list);
        }
    }
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSurface for MemorySurface {
    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, time: f64) {
        self.current_time = time;
    }

    fn native_seekable(&self) -> TimeRanges {
        self.native_seekable.clone()
    }

    fn src(&self) -> Option<String> {
        self.src.clone()
    }

    fn set_src(&mut self, src: Option<&str>) {
        self.src = src.map(str::to_string);
    }

    fn text_tracks(&self) -> SharedTextTracks {
        self.text_tracks.clone()
    }

    fn track_list_host(&mut self) -> Option<&mut dyn TrackListHost> {
        self.host.as_mut().map(|h| h as &mut dyn TrackListHost)
    }

    fn native_start_date(&self) -> Option<DateTime<Utc>> {
        self.native_start_date
    }

    fn supports_native_hls(&self) -> bool {
        self.native_hls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RenditionId, Resolution};

    fn script() -> EngineScript {
        EngineScript {
            levels: vec![
                Rendition::level("low", Resolution::new(640, 360), 800_000),
                Rendition::level("high", Resolution::new(1920, 1080), 5_000_000),
            ],
            initial_level: Some(0),
            ..Default::default()
        }
    }

    #[test]
    fn test_events_follow_subscription_kinds() {
        let mut engine = ScriptedEngine::new(script());
        let mut levels_only = engine.subscribe(&[EngineEventKind::LevelSwitched]);
        let mut all = engine.subscribe(&EngineEventKind::ALL);

        engine.handle().complete_manifest_load();

        assert_eq!(
            levels_only.try_next(),
            Some(EngineEvent::LevelSwitched {
                id: RenditionId::from("low")
            })
        );
        assert_eq!(levels_only.try_next(), None);
        assert_eq!(all.try_next().map(|e| e.kind()), Some(EngineEventKind::ManifestParsed));
    }

    #[test]
    fn test_commands_recorded() {
        let mut engine = ScriptedEngine::new(script());
        engine.load_source("https://host/master.m3u8");
        engine.attach_media();
        engine.set_current_level(1);
        engine.set_current_level(9);

        assert_eq!(
            engine.handle().commands(),
            vec![
                EngineCommand::LoadSource("https://host/master.m3u8".into()),
                EngineCommand::AttachMedia,
                EngineCommand::SetLevel(1),
                EngineCommand::SetLevel(9),
            ]
        );
        assert_eq!(engine.current_level(), Some(1));
    }

    #[test]
    fn test_destroy_drops_subscribers() {
        let mut engine = ScriptedEngine::new(script());
        let _sub = engine.subscribe(&EngineEventKind::ALL);
        let handle = engine.handle();
        assert_eq!(handle.subscriber_count(), 1);

        engine.destroy();
        assert_eq!(handle.subscriber_count(), 0);
        assert!(handle.is_destroyed());
    }

    #[test]
    fn test_factory_tracks_engines() {
        let factory = ScriptedEngineFactory::new(script());
        let config = EngineConfig {
            live_sync_duration_count: 5,
            ..Default::default()
        };
        let _first = factory.create(&EngineConfig::default());
        let _second = factory.create(&config);

        assert_eq!(factory.handles().len(), 2);
        assert_eq!(factory.latest().map(|h| h.config().live_sync_duration_count), Some(5));
    }

    #[test]
    fn test_surface_without_host() {
        let mut surface = MemorySurface::without_track_host();
        assert!(surface.track_list_host().is_none());
        surface.advertise_video_tracks(crate::tracks::TrackList::shared());
        assert!(surface.video_track_list().is_none());
    }
}

//! Rendition synchronizer
//!
//! Keeps one media kind's track list in step with the engine:
//! - engine rendition set -> one entry per rendition
//! - engine rendition switch -> selected/enabled flag
//! - user selection in the list -> engine switch command
//!
//! Entries and renditions are matched by stable identifier only.

use crate::binder::TrackListBinder;
use crate::engine::AdaptiveEngine;
use crate::surface::PlaybackSurface;
use crate::tracks::{MediaTrack, SharedTrackList};
use crate::types::{MediaKind, Rendition, RenditionId};
use tracing::debug;

/// Synchronizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No session
    Idle,
    /// List holds one entry per current rendition
    Populated,
}

fn renditions(kind: MediaKind, engine: &dyn AdaptiveEngine) -> &[Rendition] {
    match kind {
        MediaKind::Video => engine.levels(),
        MediaKind::Audio => engine.audio_tracks(),
    }
}

fn active_index(kind: MediaKind, engine: &dyn AdaptiveEngine) -> Option<usize> {
    match kind {
        MediaKind::Video => engine.current_level(),
        MediaKind::Audio => engine.audio_track(),
    }
}

fn switch_to(kind: MediaKind, engine: &mut dyn AdaptiveEngine, index: usize) {
    match kind {
        MediaKind::Video => engine.set_current_level(index),
        MediaKind::Audio => engine.set_audio_track(index),
    }
}

/// Id of the rendition the engine currently has active for a kind
pub fn active_rendition_id(kind: MediaKind, engine: &dyn AdaptiveEngine) -> Option<RenditionId> {
    let index = active_index(kind, engine)?;
    renditions(kind, engine).get(index).map(|r| r.id.clone())
}

/// Bidirectional sync for one media kind
pub struct RenditionSync<T> {
    binder: TrackListBinder<T>,
    state: SyncState,
}

impl<T: MediaTrack> RenditionSync<T> {
    pub fn new() -> Self {
        Self {
            binder: TrackListBinder::new(),
            state: SyncState::Idle,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Bind the surface's list for a new session
    pub fn bind(&mut self, surface: &mut dyn PlaybackSurface) -> SharedTrackList<T> {
        self.binder.bind(surface)
    }

    /// The list currently (or most recently) synchronized
    pub fn list(&self) -> Option<SharedTrackList<T>> {
        self.binder.list()
    }

    /// Replace self-inserted entries with one entry per rendition
    pub fn on_manifest_ready(&mut self, renditions: &[Rendition], active: Option<&RenditionId>) {
        if !self.binder.is_bound() {
            return;
        }
        let removed = self.binder.remove_owned();

        for rendition in renditions {
            let mut track = T::from_rendition(rendition);
            track.set_active(active == Some(&rendition.id));
            self.binder.insert(track);
        }
        self.binder.discard_notifications();
        self.state = SyncState::Populated;

        debug!(
            kind = %T::KIND,
            removed,
            inserted = renditions.len(),
            active = ?active,
            "Track list populated from renditions"
        );
    }

    /// Mirror an engine-side switch. Unknown ids leave the list untouched.
    pub fn on_engine_rendition_switched(&mut self, active: &RenditionId) -> bool {
        let Some(list) = self.binder.bound_list() else {
            return false;
        };
        let found = list.borrow_mut().activate_exclusive(active.as_str());
        self.binder.discard_notifications();
        if !found {
            debug!(kind = %T::KIND, id = %active, "Switched rendition has no track entry");
        }
        found
    }

    /// Forward a user/external selection to the engine.
    ///
    /// Returns true if a switch was commanded.
    pub fn on_user_selection_changed(&mut self, engine: &mut dyn AdaptiveEngine) -> bool {
        let Some(list) = self.binder.bound_list() else {
            return false;
        };
        let engine_active = active_index(T::KIND, engine);

        // Several audio entries may be enabled at once. The user's choice is
        // the first one that resolves to a rendition other than the active
        // one; entries owned by someone else resolve to nothing.
        let target = {
            let list = list.borrow();
            let renditions = renditions(T::KIND, engine);
            let found = list
                .active_tracks()
                .filter_map(|t| {
                    let index = renditions.iter().position(|r| r.id.as_str() == t.id())?;
                    Some((t.id().to_string(), index))
                })
                .find(|(_, index)| Some(*index) != engine_active);
            found
        };

        let Some((selected, index)) = target else {
            debug!(kind = %T::KIND, "No selected entry differs from the engine");
            return false;
        };

        debug!(kind = %T::KIND, id = %selected, index, "Switching engine to user selection");
        switch_to(T::KIND, engine, index);
        true
    }

    /// Drain list notifications; true if a selection change is pending
    pub fn take_selection_change(&mut self) -> bool {
        self.binder.take_selection_change()
    }

    /// Number of entries this synchronizer currently owns
    pub fn owned_count(&self) -> usize {
        self.binder.owned_count()
    }

    /// Remove self-inserted entries and the list listener
    pub fn teardown(&mut self) {
        self.binder.unbind();
        self.state = SyncState::Idle;
    }
}

impl<T: MediaTrack> Default for RenditionSync<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::sim::{EngineScript, MemorySurface, ScriptedEngine};
    use crate::tracks::{AudioTrack, VideoTrack};
    use crate::types::Resolution;

    fn levels() -> Vec<Rendition> {
        vec![
            Rendition::level("480", Resolution::new(854, 480), 1_000_000),
            Rendition::level("720", Resolution::new(1280, 720), 2_000_000),
        ]
    }

    fn engine() -> ScriptedEngine {
        let script = EngineScript {
            levels: levels(),
            audio_tracks: vec![
                Rendition::audio("en", "English", "en"),
                Rendition::audio("fr", "French", "fr"),
            ],
            initial_level: Some(0),
            initial_audio_track: Some(0),
            ..Default::default()
        };
        ScriptedEngine::new(script)
    }

    #[test]
    fn test_manifest_ready_is_idempotent() {
        let mut surface = MemorySurface::new();
        let mut sync: RenditionSync<VideoTrack> = RenditionSync::new();
        let list = sync.bind(&mut surface);

        let active = RenditionId::from("720");
        sync.on_manifest_ready(&levels(), Some(&active));
        sync.on_manifest_ready(&levels(), Some(&active));

        let list = list.borrow();
        assert_eq!(list.len(), 2);
        assert_eq!(list.active().map(|t| t.id.as_str()), Some("720"));
        assert_eq!(sync.state(), SyncState::Populated);
    }

    #[test]
    fn test_unknown_switch_keeps_selection() {
        let mut surface = MemorySurface::new();
        let mut sync: RenditionSync<VideoTrack> = RenditionSync::new();
        let list = sync.bind(&mut surface);
        sync.on_manifest_ready(&levels(), Some(&RenditionId::from("480")));

        assert!(!sync.on_engine_rendition_switched(&RenditionId::from("1080")));
        assert_eq!(list.borrow().active().map(|t| t.id.as_str()), Some("480"));

        assert!(sync.on_engine_rendition_switched(&RenditionId::from("720")));
        let selected: Vec<_> = list.borrow().active_tracks().map(|t| t.id.clone()).collect();
        assert_eq!(selected, vec!["720".to_string()]);
    }

    #[test]
    fn test_user_selection_matching_engine_is_ignored() {
        let mut surface = MemorySurface::new();
        let mut engine = engine();
        let mut sync: RenditionSync<VideoTrack> = RenditionSync::new();
        let list = sync.bind(&mut surface);
        sync.on_manifest_ready(&levels(), Some(&RenditionId::from("480")));

        assert!(!sync.on_user_selection_changed(&mut engine));
        assert!(engine.handle().commands().is_empty());

        list.borrow_mut().set_active("720", true);
        assert!(sync.on_user_selection_changed(&mut engine));
        assert_eq!(engine.current_level(), Some(1));
    }

    #[test]
    fn test_stale_selection_is_ignored() {
        let mut surface = MemorySurface::new();
        let mut engine = engine();
        let mut sync: RenditionSync<VideoTrack> = RenditionSync::new();
        let list = sync.bind(&mut surface);
        sync.on_manifest_ready(
            &[Rendition::level("old", Resolution::new(640, 360), 500_000)],
            None,
        );

        list.borrow_mut().set_active("old", true);
        assert!(!sync.on_user_selection_changed(&mut engine));
        assert!(engine.handle().commands().is_empty());
    }

    #[test]
    fn test_audio_picks_entry_that_differs_from_engine() {
        let mut surface = MemorySurface::new();
        let mut engine = engine();
        let mut sync: RenditionSync<AudioTrack> = RenditionSync::new();
        let list = sync.bind(&mut surface);
        sync.on_manifest_ready(engine.audio_tracks(), Some(&RenditionId::from("en")));

        list.borrow_mut().set_active("fr", true);
        assert_eq!(list.borrow().active_tracks().count(), 2);

        assert!(sync.on_user_selection_changed(&mut engine));
        assert_eq!(engine.audio_track(), Some(1));
    }

    #[test]
    fn test_audio_skips_entries_without_rendition() {
        let mut surface = MemorySurface::new();
        let mut engine = engine();
        let mut sync: RenditionSync<AudioTrack> = RenditionSync::new();
        let list = sync.bind(&mut surface);
        let mut commentary = AudioTrack::new("commentary", "Commentary", "en");
        commentary.enabled = true;
        list.borrow_mut().add(commentary);
        sync.on_manifest_ready(engine.audio_tracks(), Some(&RenditionId::from("en")));

        list.borrow_mut().set_active("fr", true);
        assert!(sync.on_user_selection_changed(&mut engine));
        assert_eq!(engine.audio_track(), Some(1));
    }

    #[test]
    fn test_engine_driven_writes_are_not_user_changes() {
        let mut surface = MemorySurface::new();
        let mut sync: RenditionSync<VideoTrack> = RenditionSync::new();
        let list = sync.bind(&mut surface);

        sync.on_manifest_ready(&levels(), Some(&RenditionId::from("480")));
        assert!(!sync.take_selection_change());
        sync.on_engine_rendition_switched(&RenditionId::from("720"));
        assert!(!sync.take_selection_change());

        list.borrow_mut().set_active("480", true);
        assert!(sync.take_selection_change());
    }

    #[test]
    fn test_teardown_returns_to_idle() {
        let mut surface = MemorySurface::new();
        let mut sync: RenditionSync<VideoTrack> = RenditionSync::new();
        let list = sync.bind(&mut surface);
        sync.on_manifest_ready(&levels(), None);

        sync.teardown();
        assert_eq!(sync.state(), SyncState::Idle);
        assert!(list.borrow().is_empty());
        assert_eq!(list.borrow().listener_count(), 0);

        // Events after teardown are ignored
        sync.on_manifest_ready(&levels(), None);
        assert!(list.borrow().is_empty());
    }
}

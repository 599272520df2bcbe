//! Subtitle bridge
//!
//! Engine subtitle renditions are surfaced as passive placeholder text
//! tracks. Parsed cues are pushed into the matching placeholder and user
//! activation of a text track is mapped back to an engine subtitle switch.
//!
//! Placeholders created here are matched through an explicit id map. Text
//! tracks created by anyone else fall back to kind + label + language
//! matching; when two renditions share all three the first in engine order
//! wins.

use crate::engine::AdaptiveEngine;
use crate::tracks::{
    Listener, SharedTextTracks, TextTrack, TextTrackId, TextTrackMode,
};
use crate::types::{RenditionId, SubtitleRendition, TextCue};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::collections::HashMap;
use tracing::debug;

/// Source for placeholder tracks: an empty WebVTT document inlined as a
/// data URI, so activating the track performs no fetch.
pub fn placeholder_src() -> String {
    format!("data:text/vtt;base64,{}", STANDARD.encode("WEBVTT\n"))
}

/// Heuristic correspondence between a text track and a subtitle rendition
pub fn corresponds(track: &TextTrack, rendition: &SubtitleRendition) -> bool {
    track.kind == rendition.kind
        && track.label == rendition.name
        && match &track.language {
            None => true,
            Some(lang) => rendition.language.as_deref() == Some(lang.as_str()),
        }
}

/// Placeholder track <-> rendition id map
#[derive(Debug, Default)]
struct PlaceholderMap {
    by_track: HashMap<TextTrackId, RenditionId>,
    by_rendition: HashMap<RenditionId, TextTrackId>,
}

impl PlaceholderMap {
    fn insert(&mut self, track: TextTrackId, rendition: RenditionId) {
        if let Some(old) = self.by_rendition.insert(rendition.clone(), track) {
            self.by_track.remove(&old);
        }
        self.by_track.insert(track, rendition);
    }

    fn track_for(&self, rendition: &RenditionId) -> Option<TextTrackId> {
        self.by_rendition.get(rendition).copied()
    }

    fn rendition_for(&self, track: TextTrackId) -> Option<&RenditionId> {
        self.by_track.get(&track)
    }

    fn tracks(&self) -> impl Iterator<Item = TextTrackId> + '_ {
        self.by_track.keys().copied()
    }

    fn clear(&mut self) {
        self.by_track.clear();
        self.by_rendition.clear();
    }
}

/// Bridges engine subtitle renditions and the surface's text tracks
pub struct SubtitleBridge {
    text_tracks: Option<SharedTextTracks>,
    listener: Option<Listener<TextTrackId>>,
    /// Every placeholder created this session, in creation order
    created: Vec<TextTrackId>,
    map: PlaceholderMap,
}

impl SubtitleBridge {
    pub fn new() -> Self {
        Self {
            text_tracks: None,
            listener: None,
            created: Vec::new(),
            map: PlaceholderMap::default(),
        }
    }

    /// Attach to the surface's text-track collection for a new session
    pub fn bind(&mut self, text_tracks: SharedTextTracks) {
        if self.text_tracks.is_some() {
            return;
        }
        self.listener = Some(text_tracks.borrow_mut().subscribe());
        self.text_tracks = Some(text_tracks);
    }

    /// Placeholders created this session that still exist
    pub fn placeholder_count(&self) -> usize {
        let Some(tracks) = &self.text_tracks else {
            return 0;
        };
        let tracks = tracks.borrow();
        let live = self
            .created
            .iter()
            .filter(|id| tracks.get(**id).is_some())
            .count();
        live
    }

    /// Create one placeholder per rendition, in discovery order
    pub fn on_subtitle_renditions_discovered(&mut self, renditions: &[SubtitleRendition]) {
        let Some(tracks) = &self.text_tracks else {
            return;
        };
        let src = placeholder_src();
        let mut tracks = tracks.borrow_mut();

        for rendition in renditions {
            let mode = if rendition.default {
                TextTrackMode::Showing
            } else {
                TextTrackMode::Disabled
            };
            let track = TextTrack::new(rendition.kind, &rendition.name, rendition.language.as_deref())
                .with_src(src.clone())
                .with_mode(mode);
            let id = tracks.add(track);
            self.created.push(id);
            self.map.insert(id, rendition.id.clone());
        }
        drop(tracks);
        self.discard_notifications();

        debug!(count = renditions.len(), "Subtitle placeholders created");
    }

    /// Text track for a rendition: mapped placeholder first, then heuristic
    fn track_for(&self, rendition: &SubtitleRendition) -> Option<TextTrackId> {
        let tracks = self.text_tracks.as_ref()?.borrow();
        if let Some(id) = self.map.track_for(&rendition.id) {
            if tracks.get(id).is_some() {
                return Some(id);
            }
        }
        let found = tracks
            .iter()
            .filter(|t| self.map.rendition_for(t.id()).is_none())
            .find(|t| corresponds(t, rendition))
            .map(|t| t.id());
        found
    }

    /// Rendition index for a text track: mapped placeholder first, then heuristic
    fn rendition_index_for(&self, track: &TextTrack, renditions: &[SubtitleRendition]) -> Option<usize> {
        if let Some(id) = self.map.rendition_for(track.id()) {
            return renditions.iter().position(|r| &r.id == id);
        }
        renditions.iter().position(|r| corresponds(track, r))
    }

    /// Show the active rendition's track and disable every other track
    pub fn on_engine_subtitle_switched(&mut self, active: Option<&SubtitleRendition>) {
        let Some(tracks) = self.text_tracks.clone() else {
            return;
        };
        let target = active.and_then(|r| self.track_for(r));
        if active.is_some() && target.is_none() {
            debug!("Active subtitle rendition has no corresponding text track");
        }

        let mut tracks = tracks.borrow_mut();
        let ids: Vec<TextTrackId> = tracks.iter().map(|t| t.id()).collect();
        for id in ids {
            let mode = if Some(id) == target {
                TextTrackMode::Showing
            } else {
                TextTrackMode::Disabled
            };
            tracks.set_mode(id, mode);
        }
        drop(tracks);
        self.discard_notifications();
    }

    fn discard_notifications(&mut self) {
        if let Some(listener) = self.listener.as_mut() {
            listener.drain();
        }
    }

    /// Forward user text-track activation to the engine.
    ///
    /// Every non-disabled track is checked; the last one that maps to a
    /// rendition other than the engine's active one wins. Returns true if a
    /// switch was commanded.
    pub fn on_user_text_track_changed(&mut self, engine: &mut dyn AdaptiveEngine) -> bool {
        let Some(tracks) = &self.text_tracks else {
            return false;
        };
        let target = {
            let tracks = tracks.borrow();
            let renditions = engine.subtitle_tracks();
            let active = engine.subtitle_track();
            let found = tracks
                .iter()
                .filter(|t| t.mode != TextTrackMode::Disabled)
                .filter_map(|t| self.rendition_index_for(t, renditions))
                .filter(|index| Some(*index) != active)
                .last();
            found
        };

        match target {
            Some(index) => {
                debug!(index, "Switching engine subtitles to user selection");
                engine.set_subtitle_track(Some(index));
                true
            }
            None => false,
        }
    }

    /// Append parsed cues to the active rendition's track, skipping duplicates.
    ///
    /// Returns the number of cues added.
    pub fn on_cues_parsed(&mut self, active: Option<&SubtitleRendition>, cues: &[TextCue]) -> usize {
        let Some(active) = active else {
            return 0;
        };
        let Some(id) = self.track_for(active) else {
            debug!(rendition = %active.id, "No text track for parsed cues");
            return 0;
        };
        let Some(tracks) = &self.text_tracks else {
            return 0;
        };
        let mut tracks = tracks.borrow_mut();
        let added = cues
            .iter()
            .filter(|cue| tracks.add_cue(id, (*cue).clone()))
            .count();
        added
    }

    /// Drain collection notifications; true if a mode change is pending
    pub fn take_mode_change(&mut self) -> bool {
        self.listener
            .as_mut()
            .map(|l| l.take_selection_change())
            .unwrap_or(false)
    }

    /// Remove placeholders created this session and the collection listener
    pub fn teardown(&mut self) {
        if let Some(tracks) = self.text_tracks.take() {
            let mut tracks = tracks.borrow_mut();
            if let Some(listener) = self.listener.take() {
                tracks.unsubscribe(listener.id());
            }
            for id in self.created.drain(..) {
                tracks.remove(id);
            }
        }
        self.listener = None;
        self.created.clear();
        self.map.clear();
    }

    /// Placeholder ids this session created, in no particular order
    pub fn placeholder_ids(&self) -> Vec<TextTrackId> {
        self.map.tracks().collect()
    }
}

impl Default for SubtitleBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::sim::{EngineScript, ScriptedEngine};
    use crate::tracks::TextTrackList;
    use crate::types::TextTrackKind;

    fn english() -> SubtitleRendition {
        SubtitleRendition::new("subs/en", TextTrackKind::Subtitles, "English", Some("en"))
    }

    fn spanish() -> SubtitleRendition {
        SubtitleRendition::new("subs/es", TextTrackKind::Subtitles, "Spanish", Some("es"))
    }

    fn bound() -> (SubtitleBridge, SharedTextTracks) {
        let tracks = TextTrackList::shared();
        let mut bridge = SubtitleBridge::new();
        bridge.bind(tracks.clone());
        (bridge, tracks)
    }

    #[test]
    fn test_placeholder_src_is_inline_webvtt() {
        assert_eq!(placeholder_src(), "data:text/vtt;base64,V0VCVlRUCg==");
    }

    #[test]
    fn test_discovery_creates_placeholders_in_order() {
        let (mut bridge, tracks) = bound();
        bridge.on_subtitle_renditions_discovered(&[english().as_default(), spanish()]);

        let tracks = tracks.borrow();
        let labels: Vec<_> = tracks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["English", "Spanish"]);
        let modes: Vec<_> = tracks.iter().map(|t| t.mode).collect();
        assert_eq!(modes, vec![TextTrackMode::Showing, TextTrackMode::Disabled]);
        assert!(tracks.iter().all(|t| t.src.as_deref() == Some(placeholder_src().as_str())));
        assert_eq!(bridge.placeholder_count(), 2);
    }

    #[test]
    fn test_engine_switch_is_exclusive() {
        let (mut bridge, tracks) = bound();
        let external = tracks
            .borrow_mut()
            .add(TextTrack::new(TextTrackKind::Captions, "Director", None).with_mode(TextTrackMode::Showing));
        bridge.on_subtitle_renditions_discovered(&[english(), spanish()]);

        bridge.on_engine_subtitle_switched(Some(&spanish()));
        {
            let tracks = tracks.borrow();
            let showing: Vec<_> = tracks
                .iter()
                .filter(|t| t.mode != TextTrackMode::Disabled)
                .map(|t| t.label.as_str())
                .collect();
            assert_eq!(showing, vec!["Spanish"]);
            assert_eq!(tracks.get(external).map(|t| t.mode), Some(TextTrackMode::Disabled));
        }

        bridge.on_engine_subtitle_switched(None);
        assert!(tracks.borrow().iter().all(|t| t.mode == TextTrackMode::Disabled));
    }

    #[test]
    fn test_correspondence_heuristic() {
        let track = TextTrack::new(TextTrackKind::Subtitles, "English", None);
        assert!(corresponds(&track, &english()));

        let track = TextTrack::new(TextTrackKind::Subtitles, "English", Some("fr"));
        assert!(!corresponds(&track, &english()));

        let track = TextTrack::new(TextTrackKind::Captions, "English", Some("en"));
        assert!(!corresponds(&track, &english()));
    }

    #[test]
    fn test_user_activation_switches_engine() {
        let mut engine = ScriptedEngine::new(EngineScript {
            subtitle_tracks: vec![english(), spanish()],
            initial_subtitle_track: Some(0),
            ..Default::default()
        });
        let (mut bridge, tracks) = bound();
        bridge.on_subtitle_renditions_discovered(engine.subtitle_tracks());
        bridge.on_engine_subtitle_switched(engine.active_subtitle());

        // Active one showing: nothing to do
        assert!(!bridge.on_user_text_track_changed(&mut engine));

        let spanish_id = tracks.borrow().iter().find(|t| t.label == "Spanish").map(|t| t.id()).unwrap();
        tracks.borrow_mut().set_mode(spanish_id, TextTrackMode::Showing);
        assert!(bridge.on_user_text_track_changed(&mut engine));
        assert_eq!(engine.subtitle_track(), Some(1));
    }

    #[test]
    fn test_external_track_uses_heuristic() {
        let mut engine = ScriptedEngine::new(EngineScript {
            subtitle_tracks: vec![english(), spanish()],
            ..Default::default()
        });
        let (mut bridge, tracks) = bound();
        let external = tracks
            .borrow_mut()
            .add(TextTrack::new(TextTrackKind::Subtitles, "Spanish", Some("es")));

        tracks.borrow_mut().set_mode(external, TextTrackMode::Hidden);
        assert!(bridge.on_user_text_track_changed(&mut engine));
        assert_eq!(engine.subtitle_track(), Some(1));

        let added = bridge.on_cues_parsed(Some(&spanish()), &[TextCue::new(0.0, 1.0, "Hola")]);
        assert_eq!(added, 1);
        assert_eq!(tracks.borrow().get(external).map(|t| t.cues().len()), Some(1));
    }

    #[test]
    fn test_cues_deduplicated() {
        let (mut bridge, tracks) = bound();
        bridge.on_subtitle_renditions_discovered(&[english()]);

        let cues = [TextCue::new(1.0, 2.0, "Hi")];
        assert_eq!(bridge.on_cues_parsed(Some(&english()), &cues), 1);
        assert_eq!(bridge.on_cues_parsed(Some(&english()), &cues), 0);
        assert_eq!(bridge.on_cues_parsed(None, &cues), 0);

        let tracks = tracks.borrow();
        let track = tracks.iter().next().unwrap();
        assert_eq!(track.cues(), &[TextCue::new(1.0, 2.0, "Hi")]);
    }

    #[test]
    fn test_teardown_removes_only_placeholders() {
        let (mut bridge, tracks) = bound();
        let external = tracks
            .borrow_mut()
            .add(TextTrack::new(TextTrackKind::Chapters, "Chapters", None));
        bridge.on_subtitle_renditions_discovered(&[english(), spanish()]);

        bridge.teardown();
        bridge.teardown();

        let tracks = tracks.borrow();
        assert_eq!(tracks.len(), 1);
        assert!(tracks.get(external).is_some());
        assert_eq!(tracks.listener_count(), 0);
        assert_eq!(bridge.placeholder_count(), 0);
    }

    #[test]
    fn test_non_default_placeholders_start_disabled() {
        let (mut bridge, tracks) = bound();
        bridge.on_subtitle_renditions_discovered(&[english(), spanish().as_default()]);

        let tracks = tracks.borrow();
        assert!(tracks.iter().all(|t| t.mode != TextTrackMode::Hidden));
        let showing: Vec<_> = tracks
            .iter()
            .filter(|t| t.mode == TextTrackMode::Showing)
            .map(|t| t.label.as_str())
            .collect();
        assert_eq!(showing, vec!["Spanish"]);
    }

    #[test]
    fn test_engine_driven_modes_are_not_user_changes() {
        let (mut bridge, tracks) = bound();
        bridge.on_subtitle_renditions_discovered(&[english().as_default(), spanish()]);
        assert!(!bridge.take_mode_change());
        bridge.on_engine_subtitle_switched(Some(&spanish()));
        assert!(!bridge.take_mode_change());

        let english_id = tracks.borrow().iter().find(|t| t.label == "English").map(|t| t.id()).unwrap();
        tracks.borrow_mut().set_mode(english_id, TextTrackMode::Showing);
        assert!(bridge.take_mode_change());
    }
}

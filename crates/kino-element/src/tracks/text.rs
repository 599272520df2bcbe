//! Text tracks and the surface's text-track collection

use super::notify::{ListChange, Listener, ListenerId, Notifier};
use crate::types::{TextCue, TextTrackKind};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Change notification for the text-track collection
pub type TextTrackChange = ListChange<TextTrackId>;

/// Text-track collection shared with the surface
pub type SharedTextTracks = Rc<RefCell<TextTrackList>>;

/// Identifier assigned by the collection on insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextTrackId(pub u64);

impl std::fmt::Display for TextTrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "text-{}", self.0)
    }
}

/// Text track mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextTrackMode {
    #[default]
    Disabled,
    Hidden,
    Showing,
}

impl std::fmt::Display for TextTrackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextTrackMode::Disabled => write!(f, "disabled"),
            TextTrackMode::Hidden => write!(f, "hidden"),
            TextTrackMode::Showing => write!(f, "showing"),
        }
    }
}

/// A text track attached to a playback surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextTrack {
    id: TextTrackId,
    pub kind: TextTrackKind,
    pub label: String,
    /// `None` when the track declares no language
    pub language: Option<String>,
    pub mode: TextTrackMode,
    /// Source the host would fetch cues from
    pub src: Option<String>,
    cues: Vec<TextCue>,
}

impl TextTrack {
    pub fn new(kind: TextTrackKind, label: &str, language: Option<&str>) -> Self {
        Self {
            id: TextTrackId(0),
            kind,
            label: label.to_string(),
            language: language.filter(|l| !l.is_empty()).map(str::to_string),
            mode: TextTrackMode::Disabled,
            src: None,
            cues: Vec::new(),
        }
    }

    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn with_mode(mut self, mode: TextTrackMode) -> Self {
        self.mode = mode;
        self
    }

    /// Id assigned by the owning collection
    pub fn id(&self) -> TextTrackId {
        self.id
    }

    pub fn cues(&self) -> &[TextCue] {
        &self.cues
    }

    /// Append a cue unless an identical one is already present
    pub fn add_cue(&mut self, cue: TextCue) -> bool {
        if self.cues.iter().any(|c| c.is_duplicate_of(&cue)) {
            return false;
        }
        self.cues.push(cue);
        true
    }

    /// Cues active at a given time
    pub fn cues_at(&self, time: f64) -> impl Iterator<Item = &TextCue> {
        self.cues
            .iter()
            .filter(move |c| c.start_time <= time && c.end_time > time)
    }
}

/// Ordered, observable text-track collection
#[derive(Debug)]
pub struct TextTrackList {
    tracks: Vec<TextTrack>,
    next_id: u64,
    notifier: Notifier<TextTrackId>,
}

impl TextTrackList {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            notifier: Notifier::new(),
        }
    }

    pub fn shared() -> SharedTextTracks {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Insert a track, assigning its id
    pub fn add(&mut self, mut track: TextTrack) -> TextTrackId {
        let id = TextTrackId(self.next_id);
        self.next_id += 1;
        track.id = id;
        self.tracks.push(track);
        self.notifier.notify(ListChange::AddTrack(id));
        id
    }

    pub fn remove(&mut self, id: TextTrackId) -> Option<TextTrack> {
        let pos = self.tracks.iter().position(|t| t.id == id)?;
        let track = self.tracks.remove(pos);
        self.notifier.notify(ListChange::RemoveTrack(id));
        Some(track)
    }

    pub fn get(&self, id: TextTrackId) -> Option<&TextTrack> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextTrack> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Change a track's mode, notifying listeners if it differed
    pub fn set_mode(&mut self, id: TextTrackId, mode: TextTrackMode) -> bool {
        let Some(track) = self.tracks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        if track.mode != mode {
            track.mode = mode;
            self.notifier.notify(ListChange::Change);
        }
        true
    }

    /// Append a cue to a track; false if the track is gone or the cue is a duplicate
    pub fn add_cue(&mut self, id: TextTrackId, cue: TextCue) -> bool {
        self.tracks
            .iter_mut()
            .find(|t| t.id == id)
            .map(|t| t.add_cue(cue))
            .unwrap_or(false)
    }

    pub fn subscribe(&mut self) -> Listener<TextTrackId> {
        self.notifier.subscribe()
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.notifier.len()
    }
}

impl Default for TextTrackList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_assigns_ids() {
        let mut list = TextTrackList::new();
        let a = list.add(TextTrack::new(TextTrackKind::Subtitles, "English", Some("en")));
        let b = list.add(TextTrack::new(TextTrackKind::Captions, "CC", None));

        assert_ne!(a, b);
        assert_eq!(list.get(b).map(|t| t.id()), Some(b));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_empty_language_means_none() {
        let track = TextTrack::new(TextTrackKind::Subtitles, "Unknown", Some(""));
        assert_eq!(track.language, None);
    }

    #[test]
    fn test_set_mode_notifies_on_change_only() {
        let mut list = TextTrackList::new();
        let id = list.add(TextTrack::new(TextTrackKind::Subtitles, "English", Some("en")));
        let mut listener = list.subscribe();

        assert!(list.set_mode(id, TextTrackMode::Showing));
        assert!(list.set_mode(id, TextTrackMode::Showing));
        assert_eq!(listener.drain(), vec![ListChange::Change]);

        assert!(!list.set_mode(TextTrackId(99), TextTrackMode::Hidden));
    }

    #[test]
    fn test_cue_dedup() {
        let mut list = TextTrackList::new();
        let id = list.add(TextTrack::new(TextTrackKind::Subtitles, "English", Some("en")));

        assert!(list.add_cue(id, TextCue::new(1.0, 2.0, "Hi")));
        assert!(!list.add_cue(id, TextCue::new(1.0, 2.0, "Hi")));
        assert!(list.add_cue(id, TextCue::new(2.0, 3.0, "There")));

        let track = list.get(id).unwrap();
        assert_eq!(track.cues().len(), 2);
        assert_eq!(track.cues_at(1.5).count(), 1);
    }
}

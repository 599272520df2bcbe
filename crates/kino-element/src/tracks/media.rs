//! Video and audio track lists

use super::notify::{ListChange, Listener, ListenerId, Notifier};
use crate::surface::TrackListHost;
use crate::types::{MediaKind, Rendition, Resolution};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Change notification for video/audio lists, keyed by entry id
pub type TrackListChange = ListChange<String>;

/// A track list shared between the surface, this crate and external code
pub type SharedTrackList<T> = Rc<RefCell<TrackList<T>>>;

/// Opaque handle for one inserted entry, unique within its list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackHandle(u64);

/// Behaviour shared by [`VideoTrack`] and [`AudioTrack`]
pub trait MediaTrack: Clone + std::fmt::Debug {
    /// Media kind this track type represents
    const KIND: MediaKind;

    /// Build an unselected entry mirroring an engine rendition
    fn from_rendition(rendition: &Rendition) -> Self;

    fn id(&self) -> &str;

    /// `selected` for video, `enabled` for audio
    fn is_active(&self) -> bool;

    fn set_active(&mut self, active: bool);

    /// The list of this kind a host currently advertises
    fn lookup(host: &dyn TrackListHost) -> Option<SharedTrackList<Self>>;

    /// Advertise a list of this kind on a host
    fn publish(host: &mut dyn TrackListHost, list: SharedTrackList<Self>);
}

/// A video track entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoTrack {
    pub id: String,
    pub kind: String,
    pub label: String,
    pub language: String,
    pub selected: bool,
    pub resolution: Option<Resolution>,
    pub bandwidth: u64,
}

impl VideoTrack {
    pub fn new(id: &str, label: &str, language: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: "main".to_string(),
            label: label.to_string(),
            language: language.to_string(),
            selected: false,
            resolution: None,
            bandwidth: 0,
        }
    }
}

impl MediaTrack for VideoTrack {
    const KIND: MediaKind = MediaKind::Video;

    fn from_rendition(rendition: &Rendition) -> Self {
        Self {
            resolution: rendition.resolution,
            bandwidth: rendition.bandwidth,
            ..Self::new(
                rendition.id.as_str(),
                &rendition.label(),
                rendition.language.as_deref().unwrap_or(""),
            )
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.selected
    }

    fn set_active(&mut self, active: bool) {
        self.selected = active;
    }

    fn lookup(host: &dyn TrackListHost) -> Option<SharedTrackList<Self>> {
        host.video_tracks()
    }

    fn publish(host: &mut dyn TrackListHost, list: SharedTrackList<Self>) {
        host.set_video_tracks(list);
    }
}

/// An audio track entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub id: String,
    pub kind: String,
    pub label: String,
    pub language: String,
    pub enabled: bool,
    pub channels: Option<String>,
}

impl AudioTrack {
    pub fn new(id: &str, label: &str, language: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: "main".to_string(),
            label: label.to_string(),
            language: language.to_string(),
            enabled: false,
            channels: None,
        }
    }
}

impl MediaTrack for AudioTrack {
    const KIND: MediaKind = MediaKind::Audio;

    fn from_rendition(rendition: &Rendition) -> Self {
        Self {
            channels: rendition.channels.clone(),
            ..Self::new(
                rendition.id.as_str(),
                &rendition.label(),
                rendition.language.as_deref().unwrap_or(""),
            )
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.enabled
    }

    fn set_active(&mut self, active: bool) {
        self.enabled = active;
    }

    fn lookup(host: &dyn TrackListHost) -> Option<SharedTrackList<Self>> {
        host.audio_tracks()
    }

    fn publish(host: &mut dyn TrackListHost, list: SharedTrackList<Self>) {
        host.set_audio_tracks(list);
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    handle: TrackHandle,
    track: T,
}

/// Ordered, observable list of video or audio tracks
#[derive(Debug)]
pub struct TrackList<T> {
    entries: Vec<Entry<T>>,
    next_handle: u64,
    notifier: Notifier<String>,
}

impl<T: MediaTrack> TrackList<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_handle: 0,
            notifier: Notifier::new(),
        }
    }

    /// Create a new empty list behind a shared handle
    pub fn shared() -> SharedTrackList<T> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Append a track. For video, an already-selected track deselects the rest.
    pub fn add(&mut self, track: T) -> TrackHandle {
        let handle = TrackHandle(self.next_handle);
        self.next_handle += 1;

        let id = track.id().to_string();
        let active = track.is_active();
        self.entries.push(Entry { handle, track });
        self.notifier.notify(ListChange::AddTrack(id));

        if active && T::KIND.is_exclusive() && self.deactivate_others(handle) {
            self.notifier.notify(ListChange::Change);
        }
        handle
    }

    /// Remove the entry behind a handle
    pub fn remove(&mut self, handle: TrackHandle) -> Option<T> {
        let pos = self.entries.iter().position(|e| e.handle == handle)?;
        let entry = self.entries.remove(pos);
        self.notifier
            .notify(ListChange::RemoveTrack(entry.track.id().to_string()));
        Some(entry.track)
    }

    pub fn contains(&self, handle: TrackHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    /// First entry with the given id
    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries
            .iter()
            .map(|e| &e.track)
            .find(|t| t.id() == id)
    }

    pub fn get_by_handle(&self, handle: TrackHandle) -> Option<&T> {
        self.entries
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| &e.track)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.track)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First selected/enabled entry
    pub fn active(&self) -> Option<&T> {
        self.iter().find(|t| t.is_active())
    }

    /// All selected/enabled entries in list order
    pub fn active_tracks(&self) -> impl Iterator<Item = &T> {
        self.iter().filter(|t| t.is_active())
    }

    /// Select/enable or deselect/disable an entry the way a user would.
    ///
    /// Selecting a video entry deselects its siblings; audio entries are
    /// toggled independently. Returns false if no entry has that id.
    pub fn set_active(&mut self, id: &str, active: bool) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.track.id() == id) else {
            return false;
        };
        let handle = entry.handle;
        let mut changed = entry.track.is_active() != active;
        entry.track.set_active(active);

        if active && T::KIND.is_exclusive() {
            changed |= self.deactivate_others(handle);
        }
        if changed {
            self.notifier.notify(ListChange::Change);
        }
        true
    }

    /// Make one entry the only active entry, for either kind.
    ///
    /// Returns false if no entry has that id; emits a change only when the
    /// selection actually moved.
    pub fn activate_exclusive(&mut self, id: &str) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.track.id() == id) else {
            return false;
        };
        let handle = entry.handle;
        let was_active = entry.track.is_active();
        entry.track.set_active(true);

        let siblings_changed = self.deactivate_others(handle);
        if !was_active || siblings_changed {
            self.notifier.notify(ListChange::Change);
        }
        true
    }

    /// Handle and selected/enabled flag of every entry, in list order
    pub fn selection_snapshot(&self) -> Vec<(TrackHandle, bool)> {
        self.entries
            .iter()
            .map(|e| (e.handle, e.track.is_active()))
            .collect()
    }

    /// Put back flags taken with `selection_snapshot` on entries still present
    pub fn restore_selection(&mut self, snapshot: &[(TrackHandle, bool)]) {
        let mut changed = false;
        for (handle, active) in snapshot {
            let Some(entry) = self.entries.iter_mut().find(|e| e.handle == *handle) else {
                continue;
            };
            if entry.track.is_active() != *active {
                entry.track.set_active(*active);
                changed = true;
            }
        }
        if changed {
            self.notifier.notify(ListChange::Change);
        }
    }

    /// Deactivate every entry except one, reporting whether any flipped
    fn deactivate_others(&mut self, keep: TrackHandle) -> bool {
        let mut changed = false;
        for entry in self.entries.iter_mut().filter(|e| e.handle != keep) {
            if entry.track.is_active() {
                entry.track.set_active(false);
                changed = true;
            }
        }
        changed
    }

    /// Subscribe to add/remove/change notifications
    pub fn subscribe(&mut self) -> Listener<String> {
        self.notifier.subscribe()
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.notifier.len()
    }
}

impl<T: MediaTrack> Default for TrackList<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected(list: &TrackList<VideoTrack>) -> Vec<String> {
        list.active_tracks().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_video_selection_is_exclusive() {
        let mut list = TrackList::new();
        list.add(VideoTrack::new("a", "A", ""));
        list.add(VideoTrack::new("b", "B", ""));

        assert!(list.set_active("a", true));
        assert!(list.set_active("b", true));
        assert_eq!(selected(&list), vec!["b".to_string()]);

        assert!(!list.set_active("missing", true));
    }

    #[test]
    fn test_audio_enable_is_independent() {
        let mut list = TrackList::new();
        list.add(AudioTrack::new("en", "English", "en"));
        list.add(AudioTrack::new("fr", "French", "fr"));

        list.set_active("en", true);
        list.set_active("fr", true);
        assert_eq!(list.active_tracks().count(), 2);

        list.activate_exclusive("fr");
        let enabled: Vec<_> = list.active_tracks().map(|t| t.id.as_str()).collect();
        assert_eq!(enabled, vec!["fr"]);
    }

    #[test]
    fn test_handles_distinguish_same_id() {
        let mut list = TrackList::new();
        let first = list.add(VideoTrack::new("dup", "external", ""));
        let second = list.add(VideoTrack::new("dup", "ours", ""));

        assert_eq!(list.remove(second).map(|t| t.label), Some("ours".to_string()));
        assert!(list.contains(first));
        assert!(list.remove(second).is_none());
        assert_eq!(list.get("dup").map(|t| t.label.as_str()), Some("external"));
    }

    #[test]
    fn test_notifications() {
        let mut list = TrackList::new();
        let mut listener = list.subscribe();

        let handle = list.add(VideoTrack::new("a", "A", ""));
        list.set_active("a", true);
        list.set_active("a", true);
        list.remove(handle);

        assert_eq!(
            listener.drain(),
            vec![
                ListChange::AddTrack("a".to_string()),
                ListChange::Change,
                ListChange::RemoveTrack("a".to_string()),
            ]
        );
    }

    #[test]
    fn test_activate_exclusive_without_movement_is_silent() {
        let mut list = TrackList::new();
        let mut track = VideoTrack::new("a", "A", "");
        track.selected = true;
        list.add(track);
        let mut listener = list.subscribe();

        assert!(list.activate_exclusive("a"));
        assert!(!listener.take_selection_change());
        assert!(!list.activate_exclusive("zzz"));
    }

    #[test]
    fn test_from_rendition() {
        let rendition = Rendition::level("720", Resolution::new(1280, 720), 2_000_000);
        let track = VideoTrack::from_rendition(&rendition);
        assert_eq!(track.id, "720");
        assert_eq!(track.label, "720p@2Mbps");
        assert!(!track.selected);

        let audio = AudioTrack::from_rendition(&Rendition::audio("aud/en", "English", "en"));
        assert_eq!(audio.language, "en");
        assert!(!audio.enabled);
    }
}

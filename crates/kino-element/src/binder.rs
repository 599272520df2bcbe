//! Track-list binder
//!
//! Finds or creates the video/audio track list of a surface and remembers
//! which entries it inserted, so that unbinding removes exactly those.

use crate::surface::PlaybackSurface;
use crate::tracks::{Listener, MediaTrack, SharedTrackList, TrackHandle, TrackList};
use tracing::debug;

struct Binding<T> {
    list: SharedTrackList<T>,
    listener: Listener<String>,
    /// Entries this binder inserted
    owned: Vec<TrackHandle>,
    /// Selection flags of the entries present at bind time
    external: Vec<(TrackHandle, bool)>,
}

/// Binds one media kind's track list to a surface
pub struct TrackListBinder<T> {
    /// List kept when the surface cannot host one
    private: Option<SharedTrackList<T>>,
    binding: Option<Binding<T>>,
}

impl<T: MediaTrack> TrackListBinder<T> {
    pub fn new() -> Self {
        Self {
            private: None,
            binding: None,
        }
    }

    /// Locate or create the list and subscribe to it.
    ///
    /// A list the surface already advertises is reused as-is. Binding again
    /// without unbinding returns the bound list unchanged.
    pub fn bind(&mut self, surface: &mut dyn PlaybackSurface) -> SharedTrackList<T> {
        if let Some(binding) = &self.binding {
            return binding.list.clone();
        }

        let list = match surface.track_list_host() {
            Some(host) => match T::lookup(host) {
                Some(existing) => {
                    debug!(kind = %T::KIND, "Reusing track list advertised by surface");
                    existing
                }
                None => {
                    let list = TrackList::shared();
                    T::publish(host, list.clone());
                    debug!(kind = %T::KIND, "Published new track list on surface");
                    list
                }
            },
            None => self.private.get_or_insert_with(TrackList::shared).clone(),
        };

        let (listener, external) = {
            let mut list = list.borrow_mut();
            (list.subscribe(), list.selection_snapshot())
        };
        self.binding = Some(Binding {
            list: list.clone(),
            listener,
            owned: Vec::new(),
            external,
        });
        list
    }

    /// Remove the listener and every self-inserted entry, and put the
    /// remaining entries back to the selection they had at bind time
    pub fn unbind(&mut self) {
        let Some(binding) = self.binding.take() else {
            return;
        };
        let mut list = binding.list.borrow_mut();
        list.unsubscribe(binding.listener.id());
        for handle in binding.owned {
            list.remove(handle);
        }
        list.restore_selection(&binding.external);
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// The list bound for the current session
    pub fn bound_list(&self) -> Option<SharedTrackList<T>> {
        self.binding.as_ref().map(|b| b.list.clone())
    }

    /// The bound list, or the last list this binder used
    pub fn list(&self) -> Option<SharedTrackList<T>> {
        self.binding
            .as_ref()
            .map(|b| b.list.clone())
            .or_else(|| self.private.clone())
    }

    /// Insert an entry and record its provenance
    pub fn insert(&mut self, track: T) -> Option<TrackHandle> {
        let binding = self.binding.as_mut()?;
        let handle = binding.list.borrow_mut().add(track);
        binding.owned.push(handle);
        Some(handle)
    }

    /// Remove every entry this binder inserted, leaving the rest untouched
    pub fn remove_owned(&mut self) -> usize {
        let Some(binding) = self.binding.as_mut() else {
            return 0;
        };
        let mut list = binding.list.borrow_mut();
        let removed = binding
            .owned
            .drain(..)
            .filter(|handle| list.remove(*handle).is_some())
            .count();
        removed
    }

    /// Number of live entries this binder inserted
    pub fn owned_count(&self) -> usize {
        self.binding
            .as_ref()
            .map(|b| {
                let list = b.list.borrow();
                let live = b.owned.iter().filter(|h| list.contains(**h)).count();
                live
            })
            .unwrap_or(0)
    }

    /// Drop queued notifications caused by this crate's own writes
    pub fn discard_notifications(&mut self) {
        if let Some(binding) = self.binding.as_mut() {
            binding.listener.drain();
        }
    }

    /// Drain pending notifications; true if the selection changed
    pub fn take_selection_change(&mut self) -> bool {
        self.binding
            .as_mut()
            .map(|b| b.listener.take_selection_change())
            .unwrap_or(false)
    }
}

impl<T: MediaTrack> Default for TrackListBinder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::sim::MemorySurface;
    use crate::tracks::VideoTrack;

    #[test]
    fn test_creates_and_publishes_list() {
        let mut surface = MemorySurface::new();
        let mut binder: TrackListBinder<VideoTrack> = TrackListBinder::new();

        let list = binder.bind(&mut surface);
        let advertised = surface.video_track_list().unwrap();
        assert!(std::rc::Rc::ptr_eq(&list, &advertised));
        assert_eq!(list.borrow().listener_count(), 1);
    }

    #[test]
    fn test_reuses_existing_list_without_clearing() {
        let mut surface = MemorySurface::new();
        let existing = TrackList::shared();
        existing
            .borrow_mut()
            .add(VideoTrack::new("external", "External", ""));
        surface.advertise_video_tracks(existing.clone());

        let mut binder: TrackListBinder<VideoTrack> = TrackListBinder::new();
        let list = binder.bind(&mut surface);
        assert!(std::rc::Rc::ptr_eq(&list, &existing));
        assert_eq!(list.borrow().len(), 1);

        binder.insert(VideoTrack::new("ours", "Ours", ""));
        binder.unbind();

        let list = existing.borrow();
        assert_eq!(list.len(), 1);
        assert!(list.get("external").is_some());
        assert_eq!(list.listener_count(), 0);
    }

    #[test]
    fn test_bind_twice_subscribes_once() {
        let mut surface = MemorySurface::new();
        let mut binder: TrackListBinder<VideoTrack> = TrackListBinder::new();

        let first = binder.bind(&mut surface);
        let second = binder.bind(&mut surface);
        assert!(std::rc::Rc::ptr_eq(&first, &second));
        assert_eq!(first.borrow().listener_count(), 1);
    }

    #[test]
    fn test_private_list_without_host() {
        let mut surface = MemorySurface::without_track_host();
        let mut binder: TrackListBinder<VideoTrack> = TrackListBinder::new();

        let first = binder.bind(&mut surface);
        binder.unbind();
        binder.unbind();
        let second = binder.bind(&mut surface);
        assert!(std::rc::Rc::ptr_eq(&first, &second));
        assert!(binder.list().is_some());
    }

    #[test]
    fn test_remove_owned() {
        let mut surface = MemorySurface::new();
        let mut binder: TrackListBinder<VideoTrack> = TrackListBinder::new();
        let list = binder.bind(&mut surface);

        list.borrow_mut().add(VideoTrack::new("ext", "Ext", ""));
        binder.insert(VideoTrack::new("a", "A", ""));
        binder.insert(VideoTrack::new("b", "B", ""));
        assert_eq!(binder.owned_count(), 2);

        assert_eq!(binder.remove_owned(), 2);
        assert_eq!(binder.remove_owned(), 0);
        assert_eq!(list.borrow().len(), 1);
    }

    #[test]
    fn test_unbind_restores_external_selection() {
        let mut surface = MemorySurface::new();
        let existing = TrackList::shared();
        let mut external = VideoTrack::new("external", "External", "");
        external.selected = true;
        existing.borrow_mut().add(external);
        surface.advertise_video_tracks(existing.clone());

        let mut binder: TrackListBinder<VideoTrack> = TrackListBinder::new();
        let list = binder.bind(&mut surface);
        binder.insert(VideoTrack::new("ours", "Ours", ""));
        list.borrow_mut().activate_exclusive("ours");
        assert_eq!(list.borrow().get("external").map(|t| t.selected), Some(false));

        binder.unbind();
        let list = existing.borrow();
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("external").map(|t| t.selected), Some(true));
    }

    #[test]
    fn test_discard_notifications() {
        let mut surface = MemorySurface::new();
        let mut binder: TrackListBinder<VideoTrack> = TrackListBinder::new();
        let list = binder.bind(&mut surface);
        binder.insert(VideoTrack::new("a", "A", ""));

        list.borrow_mut().activate_exclusive("a");
        binder.discard_notifications();
        assert!(!binder.take_selection_change());

        list.borrow_mut().set_active("a", false);
        assert!(binder.take_selection_change());
    }
}

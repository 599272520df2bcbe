//! Change notification for track collections
//!
//! Listeners receive changes through an unbounded channel and drain them
//! at their own pace, so a mutation never re-enters listener code.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// Identifies one registered listener on one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

/// A change to a track collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListChange<K> {
    /// A track was inserted
    AddTrack(K),
    /// A track was removed
    RemoveTrack(K),
    /// Selection or mode changed
    Change,
}

/// Receiving end of a collection subscription
#[derive(Debug)]
pub struct Listener<K> {
    id: ListenerId,
    rx: UnboundedReceiver<ListChange<K>>,
}

impl<K> Listener<K> {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Take every queued change
    pub fn drain(&mut self) -> Vec<ListChange<K>> {
        let mut changes = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(change) => changes.push(change),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changes
    }

    /// Drain the queue, reporting whether a selection/mode change was seen
    pub fn take_selection_change(&mut self) -> bool {
        self.drain()
            .iter()
            .any(|change| matches!(change, ListChange::Change))
    }
}

/// Listener registry owned by a collection
#[derive(Debug)]
pub(crate) struct Notifier<K> {
    listeners: Vec<(ListenerId, UnboundedSender<ListChange<K>>)>,
    next_id: u64,
}

impl<K: Clone> Notifier<K> {
    pub(crate) fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub(crate) fn subscribe(&mut self) -> Listener<K> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, tx));
        Listener { id, rx }
    }

    pub(crate) fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    pub(crate) fn notify(&mut self, change: ListChange<K>) {
        // Receivers dropped without unsubscribing are pruned here
        self.listeners
            .retain(|(_, tx)| tx.send(change.clone()).is_ok());
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}

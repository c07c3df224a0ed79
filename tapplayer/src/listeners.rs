//! Listener registry shared by every player backend.
//!
//! Three independent collections (volume, player status, end of track).
//! Notification iterates over a snapshot taken under the lock, so a listener
//! may add or remove listeners without deadlocking.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::model::PlayerStatus;

/// Handle returned by `add_*_listener`, used to remove that registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type VolumeListener = Arc<dyn Fn(Option<u8>) + Send + Sync>;
pub type PlayerListener = Arc<dyn Fn(&PlayerStatus) + Send + Sync>;
pub type EndOfTrackListener = Arc<dyn Fn() + Send + Sync>;

struct Registry<L: ?Sized> {
    entries: Mutex<Vec<(ListenerId, Arc<L>)>>,
}

impl<L: ?Sized> Default for Registry<L> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<L: ?Sized> Registry<L> {
    fn add(&self, id: ListenerId, listener: Arc<L>) {
        self.entries
            .lock()
            .expect("Listener registry mutex poisoned")
            .push((id, listener));
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock().expect("Listener registry mutex poisoned");
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    fn snapshot(&self) -> Vec<Arc<L>> {
        self.entries
            .lock()
            .expect("Listener registry mutex poisoned")
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.lock().expect("Listener registry mutex poisoned").len()
    }
}

#[derive(Default)]
pub struct ListenerSet {
    next_id: AtomicU64,
    volume: Registry<dyn Fn(Option<u8>) + Send + Sync>,
    player: Registry<dyn Fn(&PlayerStatus) + Send + Sync>,
    end_of_track: Registry<dyn Fn() + Send + Sync>,
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("volume", &self.volume.len())
            .field("player", &self.player.len())
            .field("end_of_track", &self.end_of_track.len())
            .finish()
    }
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn add_volume_listener(&self, listener: VolumeListener) -> ListenerId {
        let id = self.allocate_id();
        self.volume.add(id, listener);
        id
    }

    pub fn remove_volume_listener(&self, id: ListenerId) -> bool {
        self.volume.remove(id)
    }

    pub fn add_player_listener(&self, listener: PlayerListener) -> ListenerId {
        let id = self.allocate_id();
        self.player.add(id, listener);
        id
    }

    pub fn remove_player_listener(&self, id: ListenerId) -> bool {
        self.player.remove(id)
    }

    pub fn add_end_of_track_listener(&self, listener: EndOfTrackListener) -> ListenerId {
        let id = self.allocate_id();
        self.end_of_track.add(id, listener);
        id
    }

    pub fn remove_end_of_track_listener(&self, id: ListenerId) -> bool {
        self.end_of_track.remove(id)
    }

    pub fn notify_volume_listeners(&self, volume: Option<u8>) {
        for listener in self.volume.snapshot() {
            listener(volume);
        }
    }

    pub fn notify_player_listeners(&self, status: &PlayerStatus) {
        for listener in self.player.snapshot() {
            listener(status);
        }
    }

    /// Runs the end-of-track listeners on the calling thread.
    ///
    /// Backends go through [`crate::BasePlayer::notify_end_of_track_listeners`],
    /// which hands the call to the notification worker instead.
    pub fn run_end_of_track_listeners(&self) {
        for listener in self.end_of_track.snapshot() {
            listener();
        }
    }

    pub fn volume_listener_count(&self) -> usize {
        self.volume.len()
    }

    pub fn player_listener_count(&self) -> usize {
        self.player.len()
    }

    pub fn end_of_track_listener_count(&self) -> usize {
        self.end_of_track.len()
    }
}

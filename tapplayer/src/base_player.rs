//! State shared by every backend: the current [`PlayerMode`], the listener
//! registry, and the worker thread delivering end-of-track notifications.
//!
//! Backends hold a `BasePlayer` by composition; nothing here performs I/O.

use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, unbounded};
use tracing::{debug, warn};

use crate::listeners::ListenerSet;
use crate::model::{PlayerMode, PlayerStatus};

enum Notification {
    EndOfTrack,
}

pub struct BasePlayer {
    name: String,
    player_mode: RwLock<Option<PlayerMode>>,
    listeners: Arc<ListenerSet>,
    notify_tx: Mutex<Option<Sender<Notification>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for BasePlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasePlayer")
            .field("name", &self.name)
            .field("player_mode", &self.player_mode())
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl BasePlayer {
    /// Creates the shared state and starts the notification worker.
    pub fn new(name: &str) -> Self {
        let listeners = Arc::new(ListenerSet::new());
        let (tx, rx) = unbounded::<Notification>();

        let worker_listeners = Arc::clone(&listeners);
        let worker = thread::Builder::new()
            .name(format!("{}-notifier", name))
            .spawn(move || {
                for notification in rx.iter() {
                    match notification {
                        Notification::EndOfTrack => {
                            debug!("Delivering end of track notification");
                            worker_listeners.run_end_of_track_listeners();
                        }
                    }
                }
                debug!("Notification channel closed, worker exiting");
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(
                    "Failed to spawn notification worker for {}: {}. End of track listeners will run inline",
                    name, err
                );
                None
            }
        };
        let notify_tx = if worker.is_some() { Some(tx) } else { None };

        Self {
            name: name.to_string(),
            player_mode: RwLock::new(None),
            listeners,
            notify_tx: Mutex::new(notify_tx),
            worker: Mutex::new(worker),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn player_mode(&self) -> Option<PlayerMode> {
        *self.player_mode.read().expect("Player mode lock poisoned")
    }

    pub fn set_player_mode(&self, mode: PlayerMode) {
        debug!(player = %self.name, mode = %mode, "Player mode changed");
        *self.player_mode.write().expect("Player mode lock poisoned") = Some(mode);
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    pub fn notify_volume_listeners(&self, volume: Option<u8>) {
        self.listeners.notify_volume_listeners(volume);
    }

    pub fn notify_player_listeners(&self, status: &PlayerStatus) {
        self.listeners.notify_player_listeners(status);
    }

    /// Queues an end-of-track notification and returns immediately.
    ///
    /// The listeners run on the notification worker, never on the caller's
    /// thread, so the event loops can go straight back to waiting.
    pub fn notify_end_of_track_listeners(&self) {
        let sender = self
            .notify_tx
            .lock()
            .expect("Notification sender mutex poisoned")
            .clone();

        match sender {
            Some(tx) => {
                if tx.send(Notification::EndOfTrack).is_err() {
                    warn!(player = %self.name, "Notification worker is gone, dropping end of track event");
                }
            }
            None => self.listeners.run_end_of_track_listeners(),
        }
    }

    /// Closes the notification channel and waits for pending deliveries.
    pub fn stop_notifier(&self) {
        self.notify_tx
            .lock()
            .expect("Notification sender mutex poisoned")
            .take();

        let handle = self
            .worker
            .lock()
            .expect("Notification worker mutex poisoned")
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            let _ = handle.join();
        }
    }
}

impl Drop for BasePlayer {
    fn drop(&mut self) {
        self.stop_notifier();
    }
}

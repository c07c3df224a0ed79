use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use tracing::{debug, info, warn};

use crate::base_player::BasePlayer;
use crate::config_ext::EngineSettings;
use crate::engine::media::{EngineEvent, MediaEngine};
use crate::errors::PlayerError;
use crate::model::{PlaybackMode, PlaybackRequest, PlayerStatus, PlaylistDescriptor, keys};
use crate::mpd::url::decoded_file_name;
use crate::player::Player;
use crate::time_utils::{format_seconds, ms_to_seconds, seconds_to_ms, to_decimal_seconds};

const BACKEND_NAME: &str = "engine";
const PLAYING_STATE: &str = "playing";

/// What the engine was last asked to play.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EngineMode {
    Radio,
    FilePlaylist,
    FileAudio,
}

#[derive(Debug)]
struct EngineState {
    mode: EngineMode,
    /// Start offset of the current media, in seconds.
    seek_time: f64,
    /// Last `NowPlaying` value reported to listeners.
    current_track: String,
}

/// Player backed by an in-process [`MediaEngine`].
///
/// Two background threads run next to the command thread: an event relay
/// consuming [`EngineEvent`]s and a radio poller reading stream metadata.
#[derive(Clone)]
pub struct EnginePlayer {
    base: Arc<BasePlayer>,
    engine: Arc<dyn MediaEngine>,
    settings: Arc<EngineSettings>,
    state: Arc<Mutex<EngineState>>,
    running: Arc<AtomicBool>,
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl std::fmt::Debug for EnginePlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnginePlayer")
            .field("settings", &self.settings)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

impl EnginePlayer {
    /// Attaches to `engine` and starts the background threads.
    pub fn new(engine: Arc<dyn MediaEngine>, settings: EngineSettings) -> Result<Self, PlayerError> {
        let (tx, rx) = unbounded::<EngineEvent>();
        engine.attach_events(tx)?;

        let player = Self {
            base: Arc::new(BasePlayer::new(BACKEND_NAME)),
            engine,
            settings: Arc::new(settings),
            state: Arc::new(Mutex::new(EngineState {
                mode: EngineMode::Radio,
                seek_time: 0.0,
                current_track: String::new(),
            })),
            running: Arc::new(AtomicBool::new(true)),
            handles: Arc::new(Mutex::new(Vec::new())),
        };

        let relay = player.clone();
        let relay_handle = thread::Builder::new()
            .name("engine-events".to_string())
            .spawn(move || relay.event_relay_loop(rx))
            .map_err(|e| PlayerError::engine(format!("Failed to spawn event relay thread: {}", e)))?;

        let poller = player.clone();
        let poll_handle = thread::Builder::new()
            .name("engine-radio-poll".to_string())
            .spawn(move || poller.radio_poll_loop())
            .map_err(|e| PlayerError::engine(format!("Failed to spawn radio poll thread: {}", e)))?;

        player
            .handles
            .lock()
            .expect("Thread handles mutex poisoned")
            .extend([relay_handle, poll_handle]);

        info!("Media engine player started");
        Ok(player)
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().expect("Engine state mutex poisoned")
    }

    fn event_relay_loop(&self, events: Receiver<EngineEvent>) {
        while self.running.load(Ordering::SeqCst) {
            match events.recv_timeout(self.settings.radio_poll_interval) {
                Ok(EngineEvent::EndReached) => {
                    debug!("Engine reached end of media");
                    self.base.notify_end_of_track_listeners();
                }
                Ok(EngineEvent::Playing) => self.track_changed(),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("Engine event channel closed");
                    break;
                }
            }
        }
        debug!("Engine event relay exiting");
    }

    fn radio_poll_loop(&self) {
        while self.running.load(Ordering::SeqCst) {
            if let Some(title) = self.poll_now_playing() {
                let mut status = PlayerStatus::new();
                status.set(keys::CURRENT_TITLE, title);
                self.base.notify_player_listeners(&status);
            }
            thread::sleep(self.settings.radio_poll_interval);
        }
        debug!("Engine radio poller exiting");
    }

    /// Returns the stream title when it changed since the last poll.
    fn poll_now_playing(&self) -> Option<String> {
        let mut state = self.lock_state();
        if state.mode != EngineMode::Radio || !self.engine.has_media() {
            return None;
        }

        let title = self.engine.now_playing().filter(|t| !t.is_empty())?;
        if title == state.current_track {
            return None;
        }
        state.current_track = title.clone();
        Some(title)
    }

    /// Publishes the metadata of newly started media and applies the
    /// pending start offset.
    fn track_changed(&self) {
        let seek_time = {
            let state = self.lock_state();
            if state.mode == EngineMode::Radio {
                return;
            }
            state.seek_time
        };

        let mut status = PlayerStatus::new();
        status.set(keys::SOURCE, keys::SOURCE_PLAYER);
        status.set(keys::STATE, PLAYING_STATE);
        status.set_opt(keys::FILE_NAME, self.engine.media_mrl().as_deref().map(decoded_file_name));
        status.set_opt(keys::CURRENT_TITLE, self.engine.media_title());
        status.set_opt(
            keys::TIME,
            self.engine.length().map(|ms| format_seconds(ms_to_seconds(ms))),
        );
        status.set(keys::SEEK_TIME, format_seconds(seek_time));
        self.base.notify_player_listeners(&status);

        if seek_time != 0.0 {
            if let Err(err) = self.engine.set_time(seconds_to_ms(seek_time)) {
                warn!(error = %err, "Failed to apply start offset");
            }
        }
    }

    /// Runs `action` with the output silenced, then restores `restore` or
    /// the volume found before silencing.
    fn with_silenced_output(
        &self,
        restore: Option<u8>,
        action: impl FnOnce() -> Result<(), PlayerError>,
    ) -> Result<(), PlayerError> {
        let previous = self.engine.volume();
        self.engine.set_volume(0)?;
        let result = action();
        if let Some(level) = restore.or(previous) {
            self.engine.set_volume(level)?;
        }
        result
    }
}

impl Player for EnginePlayer {
    fn base(&self) -> &BasePlayer {
        &self.base
    }

    fn play(&self, request: &PlaybackRequest) -> Result<(), PlayerError> {
        let Some(url) = request.url.as_deref() else {
            debug!("Play request without url ignored");
            return Ok(());
        };
        let mrl = url.replace('\\', "/").replace('"', "");
        let seek_time = match request.track_time.as_deref() {
            Some(t) if !t.trim().is_empty() => to_decimal_seconds(t)?,
            _ => 0.0,
        };
        let mode = match request.playback_mode {
            Some(PlaybackMode::Playlist) => EngineMode::FilePlaylist,
            Some(PlaybackMode::File) => EngineMode::FileAudio,
            None => EngineMode::Radio,
        };

        self.engine.stop()?;

        let mut state = self.lock_state();
        state.mode = mode;
        state.seek_time = seek_time;
        state.current_track.clear();

        debug!(mrl = %mrl, mode = ?mode, "Loading media");
        self.with_silenced_output(request.volume, || {
            self.engine.load(&mrl)?;
            self.engine.play()
        })?;
        drop(state);

        if request.pause {
            self.pause()?;
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), PlayerError> {
        let _state = self.lock_state();
        self.engine.stop()
    }

    fn pause(&self) -> Result<(), PlayerError> {
        let _state = self.lock_state();
        self.engine.set_pause(true)
    }

    fn play_pause(&self, pause: bool) -> Result<(), PlayerError> {
        let _state = self.lock_state();
        self.engine.set_pause(pause)
    }

    fn seek(&self, position: &str) -> Result<(), PlayerError> {
        let seconds = to_decimal_seconds(position)?;
        let mut state = self.lock_state();
        state.seek_time = seconds;
        self.with_silenced_output(None, || self.engine.set_time(seconds_to_ms(seconds)))
    }

    fn set_volume(&self, level: u8) -> Result<(), PlayerError> {
        let _state = self.lock_state();
        self.engine.set_volume(level.min(100))
    }

    fn get_volume(&self) -> Result<Option<u8>, PlayerError> {
        let _state = self.lock_state();
        Ok(self.engine.volume())
    }

    fn mute(&self) -> Result<(), PlayerError> {
        let _state = self.lock_state();
        self.engine.toggle_mute()
    }

    fn get_current_track_time(&self) -> Option<String> {
        self.engine
            .time()
            .map(|ms| format_seconds(ms_to_seconds(ms)))
    }

    fn load_playlist(&self, _descriptor: &PlaylistDescriptor) -> Result<Vec<String>, PlayerError> {
        Err(PlayerError::not_supported("load_playlist", BACKEND_NAME))
    }

    fn shutdown(&self) {
        info!("Shutting down media engine player");
        self.running.store(false, Ordering::SeqCst);
        if let Err(err) = self.engine.stop() {
            warn!(error = %err, "Failed to stop media engine");
        }

        let handles: Vec<JoinHandle<()>> = self
            .handles
            .lock()
            .expect("Thread handles mutex poisoned")
            .drain(..)
            .collect();
        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }
    }
}

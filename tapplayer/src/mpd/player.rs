//! Daemon backend: drives the music daemon over its line protocol.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::base_player::BasePlayer;
use crate::config_ext::MpdSettings;
use crate::errors::PlayerError;
use crate::model::{PlaybackMode, PlaybackRequest, PlaylistDescriptor, VolumeState, keys};
use crate::mpd::commands::{self, SUBSYSTEM_PLAYER, VOLUME_UNAVAILABLE};
use crate::mpd::connection::{MpdConnection, MpdDictionary};
use crate::mpd::listener::TrackContext;
use crate::mpd::url::{self, CDDA_SCHEME, CdTrack};
use crate::player::Player;
use crate::time_utils::{is_zero_time, normalize_seek_time, request_track_time};

const BACKEND_NAME: &str = "mpd";

/// State guarded by the player's session lock.
#[derive(Debug, Default)]
pub(crate) struct Session {
    pub(crate) conn: Option<MpdConnection>,
    pub(crate) volume: VolumeState,
    pub(crate) track: TrackContext,
    pub(crate) current_url: Option<String>,
}

/// Player backed by an external music daemon.
///
/// Commands go through one control connection serialised by the session
/// lock. A background thread waits on `idle` over its own connections and
/// turns daemon notifications into listener calls.
///
/// Cloning is cheap: clones share the session and the listener registry.
#[derive(Clone)]
pub struct MpdPlayer {
    pub(crate) base: Arc<BasePlayer>,
    pub(crate) settings: Arc<MpdSettings>,
    pub(crate) session: Arc<Mutex<Session>>,
    pub(crate) running: Arc<AtomicBool>,
    listener_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for MpdPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpdPlayer")
            .field("host", &self.settings.host)
            .field("port", &self.settings.port)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

impl MpdPlayer {
    pub fn new(settings: MpdSettings) -> Self {
        Self {
            base: Arc::new(BasePlayer::new(BACKEND_NAME)),
            settings: Arc::new(settings),
            session: Arc::new(Mutex::new(Session::default())),
            running: Arc::new(AtomicBool::new(false)),
            listener_handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn settings(&self) -> &MpdSettings {
        &self.settings
    }

    /// Starts the idle listener thread and opens the control connection.
    ///
    /// The listener keeps retrying until the daemon accepts connections, so
    /// an unreachable daemon is only logged here; commands reconnect on
    /// demand. Calling it again while the listener runs only reopens a
    /// dropped control connection.
    pub fn start_client(&self) -> Result<(), PlayerError> {
        self.spawn_listener()?;

        let mut session = self.lock_session();
        if session.conn.is_none() {
            match self.open_control() {
                Ok(conn) => session.conn = Some(conn),
                Err(err) => warn!(
                    host = %self.settings.host,
                    port = self.settings.port,
                    error = %err,
                    "Daemon not reachable yet, commands will reconnect"
                ),
            }
        }
        Ok(())
    }

    fn spawn_listener(&self) -> Result<(), PlayerError> {
        let mut handle_guard = self
            .listener_handle
            .lock()
            .expect("Listener handle mutex poisoned");
        if handle_guard.is_some() {
            return Ok(());
        }

        self.running.store(true, Ordering::SeqCst);
        let player = self.clone();
        let handle = thread::Builder::new()
            .name(format!("mpd-idle-{}:{}", self.settings.host, self.settings.port))
            .spawn(move || player.idle_loop())
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                PlayerError::transport(format!("Failed to spawn idle listener thread: {}", e))
            })?;
        *handle_guard = Some(handle);

        info!(
            host = %self.settings.host,
            port = self.settings.port,
            "Daemon client started"
        );
        Ok(())
    }

    /// True until `shutdown` is called on a started client.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Answer of the daemon's `status` command.
    pub fn status(&self) -> Result<MpdDictionary, PlayerError> {
        let mut session = self.lock_session();
        self.query(&mut session, commands::STATUS)
    }

    /// Answer of the daemon's `currentsong` command.
    pub fn current(&self) -> Result<MpdDictionary, PlayerError> {
        let mut session = self.lock_session();
        self.query(&mut session, commands::CURRENT_SONG)
    }

    /// Titles of the daemon's current playlist, in playlist order.
    ///
    /// Entries without a `Title` tag are listed by file name.
    pub fn get_current_playlist(&self) -> Result<Vec<String>, PlayerError> {
        let mut session = self.lock_session();
        self.current_playlist(&mut session)
    }

    /// URL handed to the daemon by the last direct `play`.
    pub fn current_url(&self) -> Option<String> {
        self.lock_session().current_url.clone()
    }

    pub(crate) fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().expect("Session mutex poisoned")
    }

    fn open_control(&self) -> Result<MpdConnection, PlayerError> {
        MpdConnection::connect(
            &self.settings.host,
            self.settings.port,
            Some(self.settings.timeout),
        )
    }

    /// Runs `f` on the control connection, opening it when needed.
    ///
    /// The connection is dropped after a transport or framing failure so
    /// the next command reconnects.
    fn with_connection<T>(
        &self,
        session: &mut Session,
        f: impl FnOnce(&mut MpdConnection) -> Result<T, PlayerError>,
    ) -> Result<T, PlayerError> {
        if session.conn.is_none() {
            session.conn = Some(self.open_control()?);
        }
        let Some(conn) = session.conn.as_mut() else {
            return Err(PlayerError::NotConnected(self.settings.host.clone()));
        };

        match f(conn) {
            Ok(value) => Ok(value),
            Err(err) => {
                if matches!(err, PlayerError::Transport(_) | PlayerError::Protocol(_)) {
                    warn!(host = %self.settings.host, error = %err, "Dropping control connection");
                    if let Some(conn) = session.conn.take() {
                        conn.disconnect();
                    }
                }
                Err(err)
            }
        }
    }

    fn run(&self, session: &mut Session, command: &str) -> Result<(), PlayerError> {
        self.with_connection(session, |conn| conn.command(command))
    }

    fn query(&self, session: &mut Session, command: &str) -> Result<MpdDictionary, PlayerError> {
        self.with_connection(session, |conn| conn.read_dictionary(command))
    }

    fn volume_locked(&self, session: &mut Session) -> Result<Option<u8>, PlayerError> {
        let status = self.query(session, commands::STATUS)?;
        let reported = status
            .get(keys::VOLUME)
            .map(String::as_str)
            .filter(|v| *v != VOLUME_UNAVAILABLE);
        Ok(session.volume.reconcile(reported))
    }

    fn set_volume_locked(&self, session: &mut Session, level: u8) -> Result<(), PlayerError> {
        session.volume.record(level);
        self.run(session, &commands::set_volume(level))
    }

    fn current_playlist(&self, session: &mut Session) -> Result<Vec<String>, PlayerError> {
        let listing = self.query(session, commands::PLAYLIST)?;
        let mut titles = Vec::with_capacity(listing.len());
        for index in 0..listing.len() {
            let info = self.query(session, &commands::playlist_info(index))?;
            let title = info
                .get(keys::TITLE)
                .cloned()
                .or_else(|| info.get(keys::FILE).map(|f| url::trailing_segment(f).to_string()));
            match title {
                Some(title) => titles.push(title),
                None => debug!(index = index, "Playlist entry without title or file"),
            }
        }
        Ok(titles)
    }

    /// Polls `status` until the daemon reports a duration for the new track.
    fn wait_for_duration(&self) {
        if self.base.player_mode().is_some_and(|mode| mode.is_live()) {
            return;
        }

        for attempt in 1..=self.settings.duration_poll_attempts {
            thread::sleep(self.settings.duration_poll_interval);
            match self.status() {
                Ok(status) if status.contains_key(keys::DURATION) => {
                    debug!(attempt = attempt, "Duration available");
                    return;
                }
                Ok(_) => {}
                Err(err) => debug!(attempt = attempt, error = %err, "Status poll failed"),
            }
        }
        debug!("No duration reported after {} attempts", self.settings.duration_poll_attempts);
    }

    fn play_playlist_entry(&self, request: &PlaybackRequest, track_time: &str) -> Result<(), PlayerError> {
        let index = request.playlist_track_number.unwrap_or(0);
        {
            let mut session = self.lock_session();
            self.run(&mut session, &commands::play_index(index))?;
        }
        self.seek(track_time)
    }

    fn play_url(&self, request: &PlaybackRequest, location: &str, track_time: &str) -> Result<(), PlayerError> {
        {
            let mut session = self.lock_session();

            let local = match (request.folder.as_deref(), request.file_name.as_deref()) {
                (Some(folder), Some(file_name)) if !url::is_http(location) => {
                    Some(url::local_path(folder, file_name, &self.settings.music_folder))
                }
                _ => None,
            };
            session.track.dont_parse_track_name = local.is_none();
            let mut target = local.unwrap_or_else(|| location.to_string());

            if let Some(volume) = request.volume {
                if session.volume.level != Some(volume) {
                    self.set_volume_locked(&mut session, volume)?;
                }
            }

            if url::is_http(&target) {
                target = url::encode_http_url(&target);
            } else if target.starts_with(CDDA_SCHEME) {
                if let Some(descriptor) = request.file_name.as_deref() {
                    let track = CdTrack::parse(descriptor)?;
                    target = track.url();
                    session.track.cd_track = Some(track);
                }
            }
            session.track.cd_track_names = request.cd_track_names.clone();
            session.track.cd_track_label = request.cd_track_label.clone().unwrap_or_default();

            self.run(&mut session, &commands::replace_and_play(&target))?;
            debug!(url = %target, "Playback started");
            session.current_url = Some(target);
        }

        self.wait_for_duration();

        if !is_zero_time(track_time) {
            self.seek(track_time)?;
            self.dispatch(SUBSYSTEM_PLAYER);
        }

        if request.pause {
            self.pause()?;
        }
        Ok(())
    }
}

impl Player for MpdPlayer {
    fn base(&self) -> &BasePlayer {
        &self.base
    }

    fn play(&self, request: &PlaybackRequest) -> Result<(), PlayerError> {
        let track_time = request_track_time(request.track_time.as_deref());

        if request.playback_mode == Some(PlaybackMode::Playlist) {
            return self.play_playlist_entry(request, &track_time);
        }

        match request.url.as_deref() {
            Some(location) => self.play_url(request, location, &track_time),
            None => {
                debug!("Play request without url ignored");
                Ok(())
            }
        }
    }

    fn stop(&self) -> Result<(), PlayerError> {
        let mut session = self.lock_session();
        if session.conn.is_none() {
            return Ok(());
        }
        self.run(&mut session, commands::STOP)
    }

    fn pause(&self) -> Result<(), PlayerError> {
        let mut session = self.lock_session();
        self.run(&mut session, commands::PAUSE)
    }

    fn play_pause(&self, pause: bool) -> Result<(), PlayerError> {
        let mut session = self.lock_session();
        if pause {
            return self.run(&mut session, commands::PAUSE);
        }

        self.run(&mut session, commands::RESUME)?;
        if session.volume.muted {
            self.run(&mut session, commands::MUTE)
        } else if let Some(level) = session.volume.level {
            self.run(&mut session, &commands::set_volume(level))
        } else {
            Ok(())
        }
    }

    fn seek(&self, position: &str) -> Result<(), PlayerError> {
        let position = normalize_seek_time(position);
        let mut session = self.lock_session();
        self.run(&mut session, &commands::seek_current(&position))
    }

    fn set_volume(&self, level: u8) -> Result<(), PlayerError> {
        let mut session = self.lock_session();
        self.set_volume_locked(&mut session, level.min(100))
    }

    fn get_volume(&self) -> Result<Option<u8>, PlayerError> {
        let mut session = self.lock_session();
        self.volume_locked(&mut session)
    }

    fn mute(&self) -> Result<(), PlayerError> {
        let mut session = self.lock_session();

        if session.volume.muted {
            match session.volume.leave_mute() {
                Some(level) => {
                    let result = self.run(&mut session, &commands::set_volume(level));
                    if result.is_err() {
                        session.volume.muted = true;
                    }
                    result
                }
                None => {
                    warn!("Leaving mute without a known volume level");
                    Ok(())
                }
            }
        } else {
            let current = self.volume_locked(&mut session)?;
            session.volume.enter_mute(current);
            self.run(&mut session, commands::MUTE)
        }
    }

    fn get_current_track_time(&self) -> Option<String> {
        match self.status() {
            Ok(status) => status.get(keys::DURATION).cloned(),
            Err(err) => {
                debug!(error = %err, "Track time lookup failed");
                None
            }
        }
    }

    fn load_playlist(&self, descriptor: &PlaylistDescriptor) -> Result<Vec<String>, PlayerError> {
        let path = url::local_path(
            descriptor.folder.as_deref().unwrap_or_default(),
            &descriptor.name,
            &self.settings.music_folder,
        );

        let mut session = self.lock_session();
        self.run(&mut session, commands::CLEAR)?;
        self.run(&mut session, &commands::load_playlist(&path))?;
        self.current_playlist(&mut session)
    }

    fn shutdown(&self) {
        info!(host = %self.settings.host, "Shutting down daemon client");
        self.running.store(false, Ordering::SeqCst);
        self.listener_handle
            .lock()
            .expect("Listener handle mutex poisoned")
            .take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_without_connection_is_noop() {
        let player = MpdPlayer::new(MpdSettings::new("127.0.0.1", 1));
        assert!(player.stop().is_ok());
        assert!(!player.is_running());
    }

    #[test]
    fn test_commands_fail_when_daemon_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let player = MpdPlayer::new(MpdSettings::new("127.0.0.1", port));
        assert!(player.pause().unwrap_err().is_transport());
        assert!(player.get_current_track_time().is_none());
    }

    #[test]
    fn test_failed_unmute_stays_muted() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let player = MpdPlayer::new(MpdSettings::new("127.0.0.1", port));
        {
            let mut session = player.lock_session();
            session.volume.record(30);
            session.volume.enter_mute(Some(30));
        }

        assert!(player.mute().is_err());
        let session = player.lock_session();
        assert!(session.volume.muted);
        assert_eq!(session.volume.level, Some(30));
    }

    #[test]
    fn test_play_without_url_is_ignored() {
        let player = MpdPlayer::new(MpdSettings::new("127.0.0.1", 1));
        assert!(player.play(&PlaybackRequest::default()).is_ok());
    }
}

//! Idle listener loop of the daemon backend and the per-mode translation
//! of daemon answers into [`PlayerStatus`] events.

use std::sync::atomic::Ordering;
use std::thread;

use tracing::{debug, trace, warn};

use crate::model::{PlayerMode, PlayerStatus, keys};
use crate::mpd::commands::{SUBSYSTEM_MIXER, SUBSYSTEM_PLAYER, SUBSYSTEM_PLAYLIST};
use crate::mpd::connection::{MpdConnection, MpdDictionary};
use crate::mpd::player::MpdPlayer;
use crate::mpd::url::{self, CdTrack};
use crate::player::Player;
use crate::time_utils::normalize_seek_time;

/// What the last `play` call told us about the current track.
#[derive(Clone, Debug, Default)]
pub(crate) struct TrackContext {
    /// Set when playback did not start from a folder + file location; the
    /// file path then makes no useful title.
    pub(crate) dont_parse_track_name: bool,
    pub(crate) cd_track: Option<CdTrack>,
    pub(crate) cd_track_names: Vec<String>,
    pub(crate) cd_track_label: String,
}

/// Reaction to one idle wake-up.
#[derive(Debug, PartialEq)]
pub(crate) enum EventOutcome {
    Notify(PlayerStatus),
    EndOfTrack,
    Ignore,
}

impl MpdPlayer {
    pub(crate) fn idle_loop(&self) {
        debug!(host = %self.settings.host, "Idle listener started");

        while self.running.load(Ordering::SeqCst) {
            let mut conn = match MpdConnection::connect(&self.settings.host, self.settings.port, None) {
                Ok(conn) => conn,
                Err(err) => {
                    debug!(error = %err, "Idle connection failed, retrying");
                    thread::sleep(self.settings.reconnect_delay);
                    continue;
                }
            };

            let line = match conn.idle() {
                Ok(line) => line,
                Err(err) => {
                    debug!(error = %err, "Idle wait interrupted");
                    conn.disconnect();
                    thread::sleep(self.settings.reconnect_delay);
                    continue;
                }
            };
            conn.disconnect();
            debug!(line = %line, "Idle wake-up");

            if line.contains(SUBSYSTEM_MIXER) {
                match self.get_volume() {
                    Ok(volume) => self.base.notify_volume_listeners(volume),
                    Err(err) => debug!(error = %err, "Volume lookup after mixer change failed"),
                }
                continue;
            }

            self.dispatch(&line);
        }

        debug!(host = %self.settings.host, "Idle listener exiting");
    }

    /// Handles one idle line according to the current player mode.
    pub(crate) fn dispatch(&self, line: &str) {
        let Some(mode) = self.base.player_mode() else {
            trace!(line = %line, "No player mode, idle line ignored");
            return;
        };

        let current = match self.current() {
            Ok(current) => current,
            Err(err) => {
                warn!(error = %err, "Failed to read current song");
                return;
            }
        };
        let status = if mode.is_live() {
            MpdDictionary::new()
        } else {
            match self.status() {
                Ok(status) => status,
                Err(err) => {
                    warn!(error = %err, "Failed to read daemon status");
                    return;
                }
            }
        };
        let context = self.lock_session().track.clone();

        match normalize_event(mode, line, current, &status, &context) {
            EventOutcome::Notify(player_status) => {
                self.base.notify_player_listeners(&player_status)
            }
            EventOutcome::EndOfTrack => {
                debug!(mode = %mode, "End of track");
                self.base.notify_end_of_track_listeners();
            }
            EventOutcome::Ignore => trace!(mode = %mode, line = %line, "Idle line ignored"),
        }
    }
}

/// Builds the reaction to an idle `line` from the `currentsong` and
/// `status` answers.
pub(crate) fn normalize_event(
    mode: PlayerMode,
    line: &str,
    current: MpdDictionary,
    status: &MpdDictionary,
    context: &TrackContext,
) -> EventOutcome {
    let current = PlayerStatus::from(current);
    match mode {
        PlayerMode::Radio | PlayerMode::Stream => radio_event(current),
        PlayerMode::AudioFiles => audio_file_event(current, status, context),
        PlayerMode::Audiobooks => audiobook_event(line, current, status),
        PlayerMode::CdPlayer => cd_event(line, current, status, context),
    }
}

fn radio_event(mut current: PlayerStatus) -> EventOutcome {
    let Some(title) = current.get(keys::TITLE).map(|t| t.trim().to_string()) else {
        return EventOutcome::Ignore;
    };

    current.set(keys::CURRENT_TITLE, title);
    current.set(keys::SOURCE, keys::SOURCE_PLAYER);
    EventOutcome::Notify(current)
}

fn audio_file_event(
    mut current: PlayerStatus,
    status: &MpdDictionary,
    context: &TrackContext,
) -> EventOutcome {
    let file = current.get(keys::FILE).map(str::to_string);
    let title = current
        .get(keys::TITLE)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| {
            if context.dont_parse_track_name {
                None
            } else {
                file.as_deref().map(|f| url::trailing_segment(f).to_string())
            }
        });
    let track = current.get(keys::TRACK).map(str::to_string);
    current.set_opt(keys::CURRENT_TRACK_ID, track);

    if title.is_none() && file.is_none() {
        return EventOutcome::EndOfTrack;
    }
    let Some(title) = title.filter(|t| !t.trim().is_empty()) else {
        return EventOutcome::Ignore;
    };

    current.set(keys::CURRENT_TITLE, title.trim());
    apply_status(&mut current, status);
    EventOutcome::Notify(current)
}

fn audiobook_event(line: &str, mut current: PlayerStatus, status: &MpdDictionary) -> EventOutcome {
    let file = current.get(keys::FILE).map(str::to_string);
    if !current.contains(keys::TITLE) && file.is_none() && line.contains(SUBSYSTEM_PLAYER) {
        return EventOutcome::EndOfTrack;
    }

    let track = current.get(keys::TRACK).map(str::to_string);
    current.set_opt(keys::CURRENT_TRACK_ID, track);
    current.set_opt(keys::CURRENT_TITLE, file.clone());
    current.set_opt(keys::FILE_NAME, file.as_deref().map(url::decoded_file_name));
    apply_status(&mut current, status);
    EventOutcome::Notify(current)
}

fn cd_event(
    line: &str,
    mut current: PlayerStatus,
    status: &MpdDictionary,
    context: &TrackContext,
) -> EventOutcome {
    let has_title = current.contains(keys::TITLE);
    let has_file = current.contains(keys::FILE);

    if line.contains(SUBSYSTEM_PLAYLIST) && !has_title {
        return EventOutcome::Ignore;
    }
    if !has_title && !has_file {
        return EventOutcome::EndOfTrack;
    }

    let track = current.get(keys::TRACK).map(str::to_string);
    current.set_opt(keys::CURRENT_TRACK_ID, track);
    current.set(keys::FILE_NAME, keys::CD_FILE_NAME);
    match &context.cd_track {
        Some(cd) => {
            current.set(keys::CD_TRACK_ID, cd.track_id.clone());
            current.set(
                keys::CURRENT_TITLE,
                cd.title(&context.cd_track_names, &context.cd_track_label),
            );
        }
        None => {
            let title = current.get(keys::TITLE).map(str::to_string);
            current.set_opt(keys::CURRENT_TITLE, title);
        }
    }
    apply_status(&mut current, status);
    EventOutcome::Notify(current)
}

/// Copies duration, state and elapsed time from a `status` answer.
fn apply_status(current: &mut PlayerStatus, status: &MpdDictionary) {
    current.set_opt(keys::TIME, status.get(keys::DURATION).cloned());
    current.set_opt(keys::STATE, status.get(keys::STATE).cloned());
    current.set(keys::SOURCE, keys::SOURCE_PLAYER);
    current.set_opt(
        keys::SEEK_TIME,
        status.get(keys::ELAPSED).map(|t| normalize_seek_time(t)),
    );
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::PlayerError;

/// Keys used in [`PlayerStatus`] payloads.
///
/// The capitalised ones are copied verbatim from the daemon's
/// `currentsong` answer, the lower-case ones are added by the backends.
pub mod keys {
    pub const TITLE: &str = "Title";
    pub const FILE: &str = "file";
    pub const TRACK: &str = "Track";
    pub const TIME: &str = "Time";
    pub const STATE: &str = "state";
    pub const SOURCE: &str = "source";
    pub const CURRENT_TITLE: &str = "current_title";
    pub const CURRENT_TRACK_ID: &str = "current_track_id";
    pub const SEEK_TIME: &str = "seek_time";
    pub const FILE_NAME: &str = "file_name";
    pub const CD_TRACK_ID: &str = "cd_track_id";

    // `status` answer
    pub const DURATION: &str = "duration";
    pub const ELAPSED: &str = "time";
    pub const VOLUME: &str = "volume";

    pub const SOURCE_PLAYER: &str = "player";
    pub const CD_FILE_NAME: &str = "cdrom";
}

/// Class of playable content currently selected by the UI.
///
/// Selects the status-normalisation policy applied to player events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerMode {
    Radio,
    AudioFiles,
    Audiobooks,
    CdPlayer,
    Stream,
}

impl PlayerMode {
    /// Radio and network streams never report a duration.
    pub fn is_live(&self) -> bool {
        matches!(self, PlayerMode::Radio | PlayerMode::Stream)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerMode::Radio => "radio",
            PlayerMode::AudioFiles => "audio-files",
            PlayerMode::Audiobooks => "audiobooks",
            PlayerMode::CdPlayer => "cd-player",
            PlayerMode::Stream => "stream",
        }
    }
}

impl fmt::Display for PlayerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerMode {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "radio" => Ok(PlayerMode::Radio),
            "audio" | "audio-files" | "audio_files" => Ok(PlayerMode::AudioFiles),
            "book" | "audiobooks" | "audiobook" => Ok(PlayerMode::Audiobooks),
            "cd" | "cd-player" | "cd_player" => Ok(PlayerMode::CdPlayer),
            "stream" => Ok(PlayerMode::Stream),
            other => Err(PlayerError::Config(format!("Unknown player mode '{}'", other))),
        }
    }
}

/// How a [`PlaybackRequest`] addresses its content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Play entry `playlist_track_number` of the already loaded playlist.
    Playlist,
    /// Replace the playlist with a single file.
    File,
}

/// Everything a UI button knows about what should be played.
#[derive(Clone, Debug, Default)]
pub struct PlaybackRequest {
    pub playback_mode: Option<PlaybackMode>,
    pub url: Option<String>,
    pub file_name: Option<String>,
    pub folder: Option<String>,
    pub volume: Option<u8>,
    /// Start offset, decimal seconds or `H:M:S`.
    pub track_time: Option<String>,
    /// Pause right after playback started.
    pub pause: bool,
    pub playlist_track_number: Option<u32>,
    /// Pre-resolved optical-disc track names, indexed by track id - 1.
    pub cd_track_names: Vec<String>,
    /// Label inserted between drive name and track id in fallback disc titles.
    pub cd_track_label: Option<String>,
}

impl PlaybackRequest {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn for_playlist_track(index: u32) -> Self {
        Self {
            playback_mode: Some(PlaybackMode::Playlist),
            playlist_track_number: Some(index),
            ..Default::default()
        }
    }

    pub fn with_file(mut self, folder: impl Into<String>, file_name: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self.file_name = Some(file_name.into());
        self.playback_mode = Some(PlaybackMode::File);
        self
    }

    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = Some(volume.min(100));
        self
    }

    pub fn with_track_time(mut self, track_time: impl Into<String>) -> Self {
        self.track_time = Some(track_time.into());
        self
    }

    pub fn paused(mut self) -> Self {
        self.pause = true;
        self
    }
}

/// Location of a stored playlist, relative to the daemon's music root.
#[derive(Clone, Debug, Default)]
pub struct PlaylistDescriptor {
    pub folder: Option<String>,
    pub name: String,
}

impl PlaylistDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            folder: None,
            name: name.into(),
        }
    }
}

/// Last applied volume and mute flag of a backend.
///
/// `level` is `None` until a level is known. Entering mute keeps the
/// pre-mute level so leaving mute can restore it exactly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VolumeState {
    pub level: Option<u8>,
    pub muted: bool,
}

impl VolumeState {
    /// Records a level applied by `set_volume`; applying a level unmutes.
    pub fn record(&mut self, level: u8) {
        self.level = Some(level);
        self.muted = false;
    }

    /// Reconciles a level reported by the backend with the recorded one.
    ///
    /// Unreadable or negative reports fall back to the recorded level. A
    /// positive report while unmuted becomes the recorded level.
    pub fn reconcile(&mut self, reported: Option<&str>) -> Option<u8> {
        let reported = reported
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v >= 0)
            .map(|v| v.min(100) as u8);

        match reported {
            Some(v) => {
                if v > 0 && !self.muted {
                    self.level = Some(v);
                }
                Some(v)
            }
            None => self.level,
        }
    }

    /// Enters mute, capturing `current` unless it is silent.
    pub fn enter_mute(&mut self, current: Option<u8>) {
        if let Some(v) = current.filter(|v| *v != 0) {
            self.level = Some(v);
        }
        self.muted = true;
    }

    /// Leaves mute and returns the level to restore.
    pub fn leave_mute(&mut self) -> Option<u8> {
        self.muted = false;
        self.level
    }
}

/// Current playback description delivered to player listeners.
///
/// Built fresh for every event; values are kept as the text the backend
/// reported so downstream display code sees them unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerStatus {
    fields: BTreeMap<String, String>,
}

impl PlayerStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// Sets `key` when `value` is present, removes it otherwise.
    pub fn set_opt<V: Into<String>>(&mut self, key: &str, value: Option<V>) {
        match value {
            Some(v) => self.set(key, v),
            None => {
                self.fields.remove(key);
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.remove(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn current_title(&self) -> Option<&str> {
        self.get(keys::CURRENT_TITLE)
    }

    pub fn state(&self) -> Option<&str> {
        self.get(keys::STATE)
    }
}

impl From<BTreeMap<String, String>> for PlayerStatus {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, String)> for PlayerStatus {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_mode_parse() {
        assert_eq!("radio".parse::<PlayerMode>().unwrap(), PlayerMode::Radio);
        assert_eq!("CD".parse::<PlayerMode>().unwrap(), PlayerMode::CdPlayer);
        assert_eq!("book".parse::<PlayerMode>().unwrap(), PlayerMode::Audiobooks);
        assert!("vinyl".parse::<PlayerMode>().is_err());
    }

    #[test]
    fn test_live_modes() {
        assert!(PlayerMode::Radio.is_live());
        assert!(PlayerMode::Stream.is_live());
        assert!(!PlayerMode::AudioFiles.is_live());
        assert!(!PlayerMode::CdPlayer.is_live());
    }

    #[test]
    fn test_status_set_opt() {
        let mut status = PlayerStatus::new();
        status.set(keys::STATE, "play");
        status.set_opt(keys::TIME, Some("215.3"));
        status.set_opt::<String>(keys::STATE, None);

        assert_eq!(status.get(keys::TIME), Some("215.3"));
        assert!(!status.contains(keys::STATE));
        assert_eq!(status.len(), 1);
    }

    #[test]
    fn test_request_builders() {
        let request = PlaybackRequest::for_url("http://example.com/a.mp3")
            .with_volume(120)
            .with_track_time("1:02")
            .paused();

        assert_eq!(request.volume, Some(100));
        assert_eq!(request.track_time.as_deref(), Some("1:02"));
        assert!(request.pause);
        assert_eq!(request.playback_mode, None);
    }

    #[test]
    fn test_volume_state_sentinel_falls_back() {
        let mut volume = VolumeState::default();
        assert_eq!(volume.reconcile(Some("-1")), None);

        volume.record(42);
        assert_eq!(volume.reconcile(Some("-1")), Some(42));
        assert_eq!(volume.reconcile(None), Some(42));
        assert_eq!(volume.reconcile(Some("55")), Some(55));
        assert_eq!(volume.level, Some(55));
    }

    #[test]
    fn test_volume_state_mute_keeps_level() {
        let mut volume = VolumeState::default();
        volume.record(30);

        volume.enter_mute(Some(30));
        assert!(volume.muted);
        // A silent report while muted must not overwrite the level.
        assert_eq!(volume.reconcile(Some("0")), Some(0));
        assert_eq!(volume.leave_mute(), Some(30));

        volume.record(0);
        volume.level = Some(25);
        volume.enter_mute(Some(0));
        assert_eq!(volume.leave_mute(), Some(25));
    }
}

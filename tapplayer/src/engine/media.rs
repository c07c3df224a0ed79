use crossbeam_channel::Sender;

use crate::errors::PlayerError;

/// Playback events pushed by a [`MediaEngine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// The loaded media played to its end.
    EndReached,
    /// Playback of newly loaded media has started.
    Playing,
}

/// In-process media engine driven by [`crate::EnginePlayer`].
///
/// Implementations wrap a native playback library. They are called from
/// the command thread and from the player's background threads, so they
/// must be shareable; times are in milliseconds and volumes in 0..=100.
pub trait MediaEngine: Send + Sync {
    /// Registers the channel receiving [`EngineEvent`]s.
    ///
    /// Engine callbacks must only push into the channel and never call back
    /// into the player.
    fn attach_events(&self, events: Sender<EngineEvent>) -> Result<(), PlayerError>;

    /// Replaces the current media with the resource at `mrl`.
    fn load(&self, mrl: &str) -> Result<(), PlayerError>;

    fn play(&self) -> Result<(), PlayerError>;

    fn stop(&self) -> Result<(), PlayerError>;

    fn set_pause(&self, pause: bool) -> Result<(), PlayerError>;

    fn set_time(&self, milliseconds: i64) -> Result<(), PlayerError>;

    /// Playback position, `None` without media.
    fn time(&self) -> Option<i64>;

    /// Length of the current media, `None` when unknown.
    fn length(&self) -> Option<i64>;

    /// Output volume, `None` when the audio output is not ready.
    fn volume(&self) -> Option<u8>;

    fn set_volume(&self, level: u8) -> Result<(), PlayerError>;

    fn toggle_mute(&self) -> Result<(), PlayerError>;

    fn has_media(&self) -> bool;

    /// `Title` metadata of the current media.
    fn media_title(&self) -> Option<String>;

    /// `NowPlaying` metadata, updated by radio streams on every song.
    fn now_playing(&self) -> Option<String>;

    /// Resource locator of the current media.
    fn media_mrl(&self) -> Option<String>;
}

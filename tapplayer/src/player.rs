use crate::base_player::BasePlayer;
use crate::errors::PlayerError;
use crate::listeners::{EndOfTrackListener, ListenerId, PlayerListener, VolumeListener};
use crate::model::{PlaybackRequest, PlayerMode, PlaylistDescriptor};

/// Common control surface of every audio backend.
///
/// The UI and the web bridge only talk to players through this trait.
/// Listener management is provided on top of [`BasePlayer`], which every
/// backend exposes through [`Player::base`].
pub trait Player: Send + Sync {
    /// Shared mode and listener state of the backend.
    fn base(&self) -> &BasePlayer;

    /// Starts playing what `request` describes.
    fn play(&self, request: &PlaybackRequest) -> Result<(), PlayerError>;

    fn stop(&self) -> Result<(), PlayerError>;

    fn pause(&self) -> Result<(), PlayerError>;

    /// Pauses when `pause` is true, resumes otherwise.
    fn play_pause(&self, pause: bool) -> Result<(), PlayerError>;

    /// Jumps to `position` (decimal seconds or `H:M:S`) in the current track.
    fn seek(&self, position: &str) -> Result<(), PlayerError>;

    fn set_volume(&self, level: u8) -> Result<(), PlayerError>;

    /// Current volume, `None` when neither the backend nor the last
    /// `set_volume` call knows it.
    fn get_volume(&self) -> Result<Option<u8>, PlayerError>;

    /// Toggles mute. Leaving mute restores the exact pre-mute level.
    fn mute(&self) -> Result<(), PlayerError>;

    /// Track time as reported by the backend; lookup failures yield `None`.
    fn get_current_track_time(&self) -> Option<String>;

    /// Replaces the current playlist and returns its track titles in order.
    fn load_playlist(&self, descriptor: &PlaylistDescriptor) -> Result<Vec<String>, PlayerError>;

    /// Lets the background loops exit after their current cycle.
    fn shutdown(&self);

    fn player_mode(&self) -> Option<PlayerMode> {
        self.base().player_mode()
    }

    fn set_player_mode(&self, mode: PlayerMode) {
        self.base().set_player_mode(mode);
    }

    fn add_volume_listener(&self, listener: VolumeListener) -> ListenerId {
        self.base().listeners().add_volume_listener(listener)
    }

    fn remove_volume_listener(&self, id: ListenerId) -> bool {
        self.base().listeners().remove_volume_listener(id)
    }

    fn add_player_listener(&self, listener: PlayerListener) -> ListenerId {
        self.base().listeners().add_player_listener(listener)
    }

    fn remove_player_listener(&self, id: ListenerId) -> bool {
        self.base().listeners().remove_player_listener(id)
    }

    fn add_end_of_track_listener(&self, listener: EndOfTrackListener) -> ListenerId {
        self.base().listeners().add_end_of_track_listener(listener)
    }

    fn remove_end_of_track_listener(&self, id: ListenerId) -> bool {
        self.base().listeners().remove_end_of_track_listener(id)
    }
}

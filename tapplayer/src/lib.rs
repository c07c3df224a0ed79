//! # tapplayer
//!
//! Audio backends of TapMusic behind one [`Player`] trait:
//!
//! - [`MpdPlayer`] drives an external music daemon over its line protocol
//!   and follows playback through the daemon's `idle` notifications.
//! - [`EnginePlayer`] drives an in-process [`MediaEngine`] and relays its
//!   callback events.
//!
//! Both normalise what they observe into [`PlayerStatus`] records and
//! deliver them, with volume and end-of-track notifications, to listeners
//! registered through the trait.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tapplayer::{MpdPlayer, MpdSettings, PlaybackRequest, Player, PlayerMode, PlayerStatus};
//!
//! # fn main() -> Result<(), tapplayer::PlayerError> {
//! let player = MpdPlayer::new(MpdSettings::default());
//! player.start_client()?;
//! player.add_player_listener(Arc::new(|status: &PlayerStatus| {
//!     println!("now playing {:?}", status.current_title());
//! }));
//! player.set_player_mode(PlayerMode::Radio);
//! player.play(&PlaybackRequest::for_url("http://example.com/stream.mp3"))?;
//! # Ok(())
//! # }
//! ```

pub mod base_player;
pub mod config_ext;
pub mod engine;
pub mod errors;
pub mod listeners;
pub mod model;
pub mod mpd;
pub mod player;
pub mod time_utils;

pub use base_player::BasePlayer;
pub use config_ext::{BackendKind, EngineSettings, MpdSettings, PlayerConfigExt};
pub use engine::{EngineEvent, EnginePlayer, MediaEngine};
pub use errors::PlayerError;
pub use listeners::{EndOfTrackListener, ListenerId, ListenerSet, PlayerListener, VolumeListener};
pub use model::{
    PlaybackMode, PlaybackRequest, PlayerMode, PlayerStatus, PlaylistDescriptor, VolumeState,
    keys,
};
pub use mpd::MpdPlayer;
pub use player::Player;

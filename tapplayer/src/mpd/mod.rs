//! Backend for an external music daemon speaking the MPD line protocol.
//!
//! - [`connection`] opens sessions and frames requests and answers.
//! - [`commands`] holds the protocol verbs and the batched play command.
//! - [`url`] turns play requests into daemon URLs.
//! - [`MpdPlayer`] implements [`crate::Player`] on top of them and runs
//!   the idle listener thread.

pub mod commands;
pub mod connection;
mod listener;
mod player;
pub mod url;

pub use connection::{MpdConnection, MpdDictionary};
pub use player::MpdPlayer;
pub use url::CdTrack;

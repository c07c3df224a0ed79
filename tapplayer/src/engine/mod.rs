//! Backend for an in-process media engine.
//!
//! The native library is reached through the [`MediaEngine`] trait, which
//! keeps [`EnginePlayer`] independent of any particular binding.

mod media;
mod player;

pub use media::{EngineEvent, MediaEngine};
pub use player::EnginePlayer;

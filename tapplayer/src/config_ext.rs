//! Player settings stored in the tapconfig configuration.
//!
//! The [`PlayerConfigExt`] trait adds typed accessors for the `player.*`
//! keys to `tapconfig::Config`. Getters persist the built-in default when a
//! key is missing, so a fresh configuration file documents every setting.
//!
//! ```no_run
//! use tapconfig::get_config;
//! use tapplayer::PlayerConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! let settings = config.mpd_settings()?;
//! println!("daemon at {}:{}", settings.host, settings.port);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde_yaml::Value;
use tapconfig::Config;

use crate::mpd::commands::DEFAULT_MPD_PORT;

pub const DEFAULT_MPD_HOST: &str = "localhost";
pub const DEFAULT_MPD_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1000;
pub const DEFAULT_DURATION_POLL_ATTEMPTS: u64 = 100;
pub const DEFAULT_DURATION_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_RADIO_POLL_INTERVAL_MS: u64 = 1000;

/// Audio backend selected by `player.backend`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Mpd,
    Engine,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Mpd => "mpd",
            BackendKind::Engine => "engine",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mpd" => Ok(BackendKind::Mpd),
            "engine" | "vlc" => Ok(BackendKind::Engine),
            other => Err(anyhow!("Unknown player backend '{}'", other)),
        }
    }
}

/// Connection and timing parameters of the daemon backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MpdSettings {
    pub host: String,
    pub port: u16,
    /// Read/write timeout of the control connection.
    pub timeout: Duration,
    /// Pause of the idle loop after a refused connection.
    pub reconnect_delay: Duration,
    pub duration_poll_attempts: u32,
    pub duration_poll_interval: Duration,
    /// Daemon music root, stripped from local file paths.
    pub music_folder: String,
}

impl Default for MpdSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_MPD_HOST.to_string(),
            port: DEFAULT_MPD_PORT,
            timeout: Duration::from_millis(DEFAULT_MPD_TIMEOUT_MS),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            duration_poll_attempts: DEFAULT_DURATION_POLL_ATTEMPTS as u32,
            duration_poll_interval: Duration::from_millis(DEFAULT_DURATION_POLL_INTERVAL_MS),
            music_folder: String::new(),
        }
    }
}

impl MpdSettings {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub radio_poll_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            radio_poll_interval: Duration::from_millis(DEFAULT_RADIO_POLL_INTERVAL_MS),
        }
    }
}

const BACKEND: &[&str] = &["player", "backend"];
const MPD_HOST: &[&str] = &["player", "mpd", "host"];
const MPD_PORT: &[&str] = &["player", "mpd", "port"];
const MPD_TIMEOUT_MS: &[&str] = &["player", "mpd", "timeout_ms"];
const MPD_RECONNECT_DELAY_MS: &[&str] = &["player", "mpd", "reconnect_delay_ms"];
const MPD_DURATION_POLL_ATTEMPTS: &[&str] = &["player", "mpd", "duration_poll_attempts"];
const MPD_DURATION_POLL_INTERVAL_MS: &[&str] = &["player", "mpd", "duration_poll_interval_ms"];
const MPD_MUSIC_FOLDER: &[&str] = &["player", "mpd", "music_folder"];
const ENGINE_RADIO_POLL_INTERVAL_MS: &[&str] = &["player", "engine", "radio_poll_interval_ms"];

/// Player settings accessors for `tapconfig::Config`.
pub trait PlayerConfigExt {
    fn get_player_backend(&self) -> Result<BackendKind>;
    fn set_player_backend(&self, backend: BackendKind) -> Result<()>;

    fn get_mpd_host(&self) -> Result<String>;
    fn set_mpd_host(&self, host: &str) -> Result<()>;

    fn get_mpd_port(&self) -> Result<u16>;
    fn set_mpd_port(&self, port: u16) -> Result<()>;

    /// Daemon music root (empty when paths are already relative).
    fn get_mpd_music_folder(&self) -> Result<String>;
    fn set_mpd_music_folder(&self, folder: &str) -> Result<()>;

    /// All `player.mpd.*` settings.
    fn mpd_settings(&self) -> Result<MpdSettings>;

    /// All `player.engine.*` settings.
    fn engine_settings(&self) -> Result<EngineSettings>;
}

impl PlayerConfigExt for Config {
    fn get_player_backend(&self) -> Result<BackendKind> {
        match self.get_string(BACKEND) {
            Some(name) => name.parse(),
            None => {
                self.set_player_backend(BackendKind::Mpd)?;
                Ok(BackendKind::Mpd)
            }
        }
    }

    fn set_player_backend(&self, backend: BackendKind) -> Result<()> {
        self.set_value(BACKEND, Value::String(backend.as_str().to_string()))
    }

    fn get_mpd_host(&self) -> Result<String> {
        match self.get_string(MPD_HOST) {
            Some(host) if !host.trim().is_empty() => Ok(host.trim().to_string()),
            _ => {
                self.set_mpd_host(DEFAULT_MPD_HOST)?;
                Ok(DEFAULT_MPD_HOST.to_string())
            }
        }
    }

    fn set_mpd_host(&self, host: &str) -> Result<()> {
        self.set_value(MPD_HOST, Value::String(host.to_string()))
    }

    fn get_mpd_port(&self) -> Result<u16> {
        match self.get_u64(MPD_PORT) {
            Some(port) => u16::try_from(port).map_err(|_| anyhow!("Invalid daemon port {}", port)),
            None => {
                self.set_mpd_port(DEFAULT_MPD_PORT)?;
                Ok(DEFAULT_MPD_PORT)
            }
        }
    }

    fn set_mpd_port(&self, port: u16) -> Result<()> {
        self.set_value(MPD_PORT, Value::Number(serde_yaml::Number::from(port)))
    }

    fn get_mpd_music_folder(&self) -> Result<String> {
        match self.get_string(MPD_MUSIC_FOLDER) {
            Some(folder) => Ok(folder),
            None => {
                self.set_mpd_music_folder("")?;
                Ok(String::new())
            }
        }
    }

    fn set_mpd_music_folder(&self, folder: &str) -> Result<()> {
        self.set_value(MPD_MUSIC_FOLDER, Value::String(folder.to_string()))
    }

    fn mpd_settings(&self) -> Result<MpdSettings> {
        let attempts = u64_or_default(self, MPD_DURATION_POLL_ATTEMPTS, DEFAULT_DURATION_POLL_ATTEMPTS)?;

        Ok(MpdSettings {
            host: self.get_mpd_host()?,
            port: self.get_mpd_port()?,
            timeout: millis_or_default(self, MPD_TIMEOUT_MS, DEFAULT_MPD_TIMEOUT_MS)?,
            reconnect_delay: millis_or_default(
                self,
                MPD_RECONNECT_DELAY_MS,
                DEFAULT_RECONNECT_DELAY_MS,
            )?,
            duration_poll_attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
            duration_poll_interval: millis_or_default(
                self,
                MPD_DURATION_POLL_INTERVAL_MS,
                DEFAULT_DURATION_POLL_INTERVAL_MS,
            )?,
            music_folder: self.get_mpd_music_folder()?,
        })
    }

    fn engine_settings(&self) -> Result<EngineSettings> {
        Ok(EngineSettings {
            radio_poll_interval: millis_or_default(
                self,
                ENGINE_RADIO_POLL_INTERVAL_MS,
                DEFAULT_RADIO_POLL_INTERVAL_MS,
            )?,
        })
    }
}

fn u64_or_default(config: &Config, path: &[&str], default: u64) -> Result<u64> {
    match config.get_u64(path) {
        Some(value) => Ok(value),
        None => {
            config.set_value(path, Value::Number(serde_yaml::Number::from(default)))?;
            Ok(default)
        }
    }
}

fn millis_or_default(config: &Config, path: &[&str], default: u64) -> Result<Duration> {
    u64_or_default(config, path, default).map(Duration::from_millis)
}

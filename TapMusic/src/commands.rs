//! Console commands read from stdin, one per line.

use anyhow::{Result, anyhow, bail};
use tapplayer::PlayerMode;

pub const HELP: &str = "\
commands:
  mode <radio|audio|book|cd|stream>   select the player mode
  play <url>                          play a stream, file or cdda url
  index <n>                           play entry n of the loaded playlist
  pause | resume | stop
  seek <time>                         seconds or H:M:S
  volume [n]                          show or set the volume (0-100)
  mute                                toggle mute
  time                                current track time
  playlist <name>                     load a stored playlist
  status                              daemon status
  quit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Mode(PlayerMode),
    Play(String),
    Index(u32),
    Pause,
    Resume,
    Stop,
    Seek(String),
    Volume(Option<u8>),
    Mute,
    Time,
    Playlist(String),
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parses one console line; blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, argument) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "mode" => Command::Mode(required(verb, argument)?.parse::<PlayerMode>()?),
            "play" => Command::Play(required(verb, argument)?.to_string()),
            "index" => Command::Index(
                required(verb, argument)?
                    .parse()
                    .map_err(|_| anyhow!("index expects a playlist position, got '{}'", argument))?,
            ),
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "stop" => Command::Stop,
            "seek" => Command::Seek(required(verb, argument)?.to_string()),
            "volume" | "vol" => {
                if argument.is_empty() {
                    Command::Volume(None)
                } else {
                    match argument.parse::<u8>() {
                        Ok(level) if level <= 100 => Command::Volume(Some(level)),
                        _ => bail!("volume expects a level between 0 and 100, got '{}'", argument),
                    }
                }
            }
            "mute" => Command::Mute,
            "time" => Command::Time,
            "playlist" => Command::Playlist(required(verb, argument)?.to_string()),
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command '{}', type help", other),
        };

        Ok(Some(command))
    }
}

fn required<'a>(verb: &str, argument: &'a str) -> Result<&'a str> {
    if argument.is_empty() {
        bail!("{} expects an argument", verb);
    }
    Ok(argument)
}

mod commands;
mod logging;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Result, bail};
use tapconfig::get_config;
use tapplayer::{
    BackendKind, MpdPlayer, PlaybackMode, PlaybackRequest, Player, PlayerConfigExt, PlayerMode, PlayerStatus,
    PlaylistDescriptor,
};
use tracing::{info, warn};

use crate::commands::{Command, HELP};

fn main() -> Result<()> {
    let config = get_config();
    logging::init_logging(&config);

    info!("Starting TapMusic player console");

    let player = match config.get_player_backend()? {
        BackendKind::Mpd => {
            let settings = config.mpd_settings()?;
            info!(host = %settings.host, port = settings.port, "Using music daemon backend");
            MpdPlayer::new(settings)
        }
        BackendKind::Engine => {
            bail!("The engine backend needs a native media binding; set player.backend to mpd")
        }
    };

    if let Err(err) = player.start_client() {
        warn!(error = %err, "Failed to start daemon client");
    }

    register_listeners(&player);
    let result = run_console(&player);

    player.shutdown();
    info!("TapMusic stopped");
    result
}

fn register_listeners(player: &MpdPlayer) {
    player.add_volume_listener(Arc::new(|volume: Option<u8>| match volume {
        Some(level) => info!(volume = level, "Volume changed"),
        None => info!("Volume changed, level unknown"),
    }));
    player.add_player_listener(Arc::new(|status: &PlayerStatus| {
        info!(
            title = status.current_title().unwrap_or("-"),
            state = status.state().unwrap_or("-"),
            "Player status"
        );
    }));
    player.add_end_of_track_listener(Arc::new(|| info!("End of track")));
}

fn run_console(player: &MpdPlayer) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", HELP)?;

    for line in stdin.lock().lines() {
        let line = line?;
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                writeln!(stdout, "{}", err)?;
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }
        if let Err(err) = execute(player, command, &mut stdout) {
            writeln!(stdout, "error: {}", err)?;
        }
    }
    Ok(())
}

fn execute(player: &MpdPlayer, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Mode(mode) => {
            player.set_player_mode(mode);
            writeln!(out, "mode {}", mode)?;
        }
        Command::Play(target) => player.play(&request_for(player.player_mode(), &target))?,
        Command::Index(index) => player.play(&PlaybackRequest::for_playlist_track(index))?,
        Command::Pause => player.play_pause(true)?,
        Command::Resume => player.play_pause(false)?,
        Command::Stop => player.stop()?,
        Command::Seek(position) => player.seek(&position)?,
        Command::Volume(Some(level)) => player.set_volume(level)?,
        Command::Volume(None) => match player.get_volume()? {
            Some(level) => writeln!(out, "volume {}", level)?,
            None => writeln!(out, "volume unknown")?,
        },
        Command::Mute => player.mute()?,
        Command::Time => match player.get_current_track_time() {
            Some(time) => writeln!(out, "time {}", time)?,
            None => writeln!(out, "time unknown")?,
        },
        Command::Playlist(name) => {
            let titles = player.load_playlist(&PlaylistDescriptor::new(name))?;
            for (index, title) in titles.iter().enumerate() {
                writeln!(out, "{:>3}  {}", index, title)?;
            }
        }
        Command::Status => {
            for (key, value) in player.status()? {
                writeln!(out, "{}: {}", key, value)?;
            }
        }
        Command::Help => writeln!(out, "{}", HELP)?,
        Command::Quit => {}
    }
    Ok(())
}

/// Builds the request for `play <target>`.
///
/// A disc descriptor such as `cdda:///dev/sr0 track=3` plays that track.
fn request_for(mode: Option<PlayerMode>, target: &str) -> PlaybackRequest {
    if target.starts_with("cdda://") && target.contains(" track=") {
        let drive = target.split_whitespace().next().unwrap_or(target);
        let mut request = PlaybackRequest::for_url(drive);
        request.file_name = Some(target.to_string());
        request.cd_track_label = Some(" Track".to_string());
        return request;
    }

    let request = PlaybackRequest::for_url(target);
    match mode {
        Some(PlayerMode::AudioFiles) | Some(PlayerMode::Audiobooks) => PlaybackRequest {
            playback_mode: Some(PlaybackMode::File),
            ..request
        },
        _ => request,
    }
}

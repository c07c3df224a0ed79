// examples/events_demo.rs
//
// Prints the events observed by the daemon backend:
//   - volume changes (mixer subsystem)
//   - player status records for the selected mode
//   - end of track notifications
//
// Run from the tapplayer crate root:
//   cargo run --example events_demo --                    # localhost:6600, radio mode
//   cargo run --example events_demo -- audio              # audio files mode
//   cargo run --example events_demo -- book music.local 6601
//
// Ctrl-C to quit.

use std::env;
use std::io;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel::unbounded;
use tapplayer::{MpdPlayer, MpdSettings, Player, PlayerMode, PlayerStatus};

enum Event {
    Volume(Option<u8>),
    Status(PlayerStatus),
    EndOfTrack,
}

fn main() -> io::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let args: Vec<String> = env::args().collect();
    let mode = match args.get(1).map(|m| m.parse::<PlayerMode>()) {
        Some(Ok(mode)) => mode,
        Some(Err(err)) => {
            eprintln!("{}, falling back to radio mode", err);
            PlayerMode::Radio
        }
        None => PlayerMode::Radio,
    };
    let mut settings = MpdSettings::default();
    if let Some(host) = args.get(2) {
        settings.host = host.clone();
    }
    if let Some(port) = args.get(3).and_then(|p| p.parse().ok()) {
        settings.port = port;
    }

    println!("Connecting to {}:{} in {} mode...", settings.host, settings.port, mode);
    let player = MpdPlayer::new(settings);
    player
        .start_client()
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e.to_string()))?;
    player.set_player_mode(mode);

    let (tx, rx) = unbounded::<Event>();
    let volume_tx = tx.clone();
    player.add_volume_listener(Arc::new(move |volume: Option<u8>| {
        let _ = volume_tx.send(Event::Volume(volume));
    }));
    let status_tx = tx.clone();
    player.add_player_listener(Arc::new(move |status: &PlayerStatus| {
        let _ = status_tx.send(Event::Status(status.clone()));
    }));
    player.add_end_of_track_listener(Arc::new(move || {
        let _ = tx.send(Event::EndOfTrack);
    }));

    println!("Listening. Press Ctrl-C to quit.\n");
    for event in rx.iter() {
        print_event(&event);
    }

    Ok(())
}

/// HH:MM:SS from the system clock (UTC).
fn now_hms() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    let total = now.as_secs() % 86_400;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn print_event(event: &Event) {
    let ts = now_hms();
    match event {
        Event::Volume(Some(level)) => println!("[{}] Volume: {}", ts, level),
        Event::Volume(None) => println!("[{}] Volume: unknown", ts),
        Event::Status(status) => {
            let fields: Vec<String> = status.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            println!("[{}] Status: {}", ts, fields.join(" "));
        }
        Event::EndOfTrack => println!("[{}] End of track", ts),
    }
}

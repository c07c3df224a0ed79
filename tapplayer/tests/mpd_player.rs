mod common;

use std::sync::Arc;
use std::time::Duration;

use common::FakeDaemon;
use crossbeam_channel::unbounded;
use tapplayer::{
    MpdPlayer, MpdSettings, PlaybackRequest, Player, PlayerError, PlayerMode, PlayerStatus,
    PlaylistDescriptor, keys,
};

const WAIT: Duration = Duration::from_secs(3);
const QUIET: Duration = Duration::from_millis(300);

fn connected_player(daemon: &FakeDaemon) -> MpdPlayer {
    let player = MpdPlayer::new(daemon.settings());
    player.start_client().unwrap();
    player
}

#[test]
fn set_volume_is_echoed_by_the_daemon() {
    let daemon = FakeDaemon::start();
    let player = MpdPlayer::new(daemon.settings());

    for level in [0u8, 1, 35, 100] {
        player.set_volume(level).unwrap();
        assert_eq!(player.get_volume().unwrap(), Some(level));
    }
    assert!(daemon.commands().contains(&"setvol 35".to_string()));
}

#[test]
fn unavailable_mixer_falls_back_to_last_level() {
    let daemon = FakeDaemon::start();
    {
        let mut state = daemon.state();
        state.volume = "-1".to_string();
        state.mixer = false;
    }
    let player = MpdPlayer::new(daemon.settings());

    assert_eq!(player.get_volume().unwrap(), None);
    player.set_volume(42).unwrap();
    assert_eq!(player.get_volume().unwrap(), Some(42));
}

#[test]
fn mute_round_trip_restores_level() {
    let daemon = FakeDaemon::start();
    let player = MpdPlayer::new(daemon.settings());

    player.set_volume(30).unwrap();
    player.mute().unwrap();
    assert_eq!(daemon.commands().last().map(String::as_str), Some("setvol 0"));
    assert_eq!(daemon.state().volume, "0");

    player.mute().unwrap();
    assert_eq!(daemon.commands().last().map(String::as_str), Some("setvol 30"));
    assert_eq!(player.get_volume().unwrap(), Some(30));
}

#[test]
fn mute_while_silent_keeps_remembered_level() {
    let daemon = FakeDaemon::start();
    let player = MpdPlayer::new(daemon.settings());

    player.set_volume(25).unwrap();
    // Volume pulled down outside the player.
    daemon.state().volume = "0".to_string();

    player.mute().unwrap();
    player.mute().unwrap();
    assert_eq!(daemon.commands().last().map(String::as_str), Some("setvol 25"));

    player.set_volume(0).unwrap();
    player.mute().unwrap();
    player.mute().unwrap();
    assert_eq!(daemon.commands().last().map(String::as_str), Some("setvol 0"));
    assert_eq!(player.get_volume().unwrap(), Some(0));
}

#[test]
fn resume_reasserts_volume_or_mute() {
    let daemon = FakeDaemon::start();
    let player = MpdPlayer::new(daemon.settings());

    player.set_volume(40).unwrap();
    player.play_pause(true).unwrap();
    player.play_pause(false).unwrap();
    let commands = daemon.commands();
    assert_eq!(&commands[commands.len() - 3..], ["pause 1", "pause 0", "setvol 40"]);

    player.mute().unwrap();
    player.play_pause(false).unwrap();
    assert_eq!(daemon.commands().last().map(String::as_str), Some("setvol 0"));
}

#[test]
fn seek_normalises_colon_times() {
    let daemon = FakeDaemon::start();
    let player = MpdPlayer::new(daemon.settings());

    player.seek("1:02:03").unwrap();
    player.seek("45").unwrap();

    let commands = daemon.commands();
    assert!(commands.contains(&"seekcur 1.02.03".to_string()));
    assert!(commands.contains(&"seekcur 45".to_string()));
}

#[test]
fn play_sends_one_framed_batch() {
    let daemon = FakeDaemon::start();
    let player = MpdPlayer::new(daemon.settings());
    player.set_player_mode(PlayerMode::Stream);

    player
        .play(&PlaybackRequest::for_url("http://example.com/stream.mp3"))
        .unwrap();

    let commands = daemon.commands();
    assert_eq!(
        commands,
        vec!["command_list_begin\nclear\nadd http://example.com/stream.mp3\nplay 0\ncommand_list_end\n"]
    );
    assert_eq!(
        player.current_url().as_deref(),
        Some("http://example.com/stream.mp3")
    );
}

#[test]
fn play_applies_volume_offset_and_pause() {
    let daemon = FakeDaemon::start();
    {
        let mut state = daemon.state();
        state.status.insert("duration".to_string(), "215.3".to_string());
        state.status.insert("state".to_string(), "play".to_string());
        state.current.insert("file".to_string(), "jazz/so what.flac".to_string());
    }
    let player = MpdPlayer::new(MpdSettings {
        music_folder: "/srv/music".to_string(),
        ..daemon.settings()
    });
    player.set_player_mode(PlayerMode::AudioFiles);

    let (tx, rx) = unbounded();
    player.add_player_listener(Arc::new(move |status: &PlayerStatus| {
        let _ = tx.send(status.clone());
    }));

    let request = PlaybackRequest::for_url("file")
        .with_file("/srv/music/jazz", "so what.flac")
        .with_volume(60)
        .with_track_time("1:30")
        .paused();
    player.play(&request).unwrap();

    let commands = daemon.commands();
    assert_eq!(commands[0], "setvol 60");
    assert_eq!(
        commands[1],
        "command_list_begin\nclear\nadd jazz/so what.flac\nplay 0\ncommand_list_end\n"
    );
    assert!(commands.contains(&"seekcur 1.30".to_string()));
    assert_eq!(commands.last().map(String::as_str), Some("pause 1"));

    let status = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(status.current_title(), Some("so what.flac"));
    assert_eq!(status.get(keys::TIME), Some("215.3"));
}

#[test]
fn play_playlist_entry_seeks_to_offset() {
    let daemon = FakeDaemon::start();
    let player = MpdPlayer::new(daemon.settings());

    player
        .play(&PlaybackRequest::for_playlist_track(3).with_track_time("12"))
        .unwrap();

    assert_eq!(daemon.commands(), vec!["play 3", "seekcur 12"]);
}

#[test]
fn play_cd_track_uses_device_url() {
    let daemon = FakeDaemon::start();
    let player = MpdPlayer::new(daemon.settings());
    player.set_player_mode(PlayerMode::CdPlayer);

    let mut request = PlaybackRequest::for_url("cdda:///dev/sr0////3");
    request.file_name = Some("cdda:///dev/sr0 track=3".to_string());
    player.play(&request).unwrap();

    assert_eq!(player.current_url().as_deref(), Some("cdda:///dev/sr0/3"));
}

#[test]
fn end_of_track_is_delivered_once_per_file_mode() {
    for mode in [PlayerMode::AudioFiles, PlayerMode::Audiobooks, PlayerMode::CdPlayer] {
        let daemon = FakeDaemon::start();
        daemon.state().status.insert("state".to_string(), "stop".to_string());
        let player = connected_player(&daemon);
        player.set_player_mode(mode);

        let (eot_tx, eot_rx) = unbounded();
        let (status_tx, status_rx) = unbounded();
        player.add_end_of_track_listener(Arc::new(move || {
            let _ = eot_tx.send(());
        }));
        player.add_player_listener(Arc::new(move |status: &PlayerStatus| {
            let _ = status_tx.send(status.clone());
        }));

        assert!(daemon.wait_for(WAIT, |s| s.idle_requests >= 1));
        daemon.notify("player");

        assert!(eot_rx.recv_timeout(WAIT).is_ok(), "mode {}", mode);
        assert!(eot_rx.recv_timeout(QUIET).is_err(), "mode {}", mode);
        assert!(status_rx.try_recv().is_err(), "mode {}", mode);
        player.shutdown();
        daemon.notify("player");
    }
}

#[test]
fn radio_title_reaches_player_listeners() {
    let daemon = FakeDaemon::start();
    daemon
        .state()
        .current
        .insert("Title".to_string(), " Artist - Song ".to_string());
    let player = connected_player(&daemon);
    player.set_player_mode(PlayerMode::Radio);

    let (tx, rx) = unbounded();
    player.add_player_listener(Arc::new(move |status: &PlayerStatus| {
        let _ = tx.send(status.clone());
    }));

    assert!(daemon.wait_for(WAIT, |s| s.idle_requests >= 1));
    daemon.notify("player");

    let status = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(status.current_title(), Some("Artist - Song"));
    assert_eq!(status.get(keys::SOURCE), Some("player"));
    player.shutdown();
    daemon.notify("player");
}

#[test]
fn mixer_change_notifies_volume_listeners() {
    let daemon = FakeDaemon::start();
    daemon.state().volume = "64".to_string();
    let player = connected_player(&daemon);

    let (tx, rx) = unbounded();
    player.add_volume_listener(Arc::new(move |volume: Option<u8>| {
        let _ = tx.send(volume);
    }));

    assert!(daemon.wait_for(WAIT, |s| s.idle_requests >= 1));
    daemon.notify("mixer");

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), Some(64));
    // The loop goes straight back to waiting.
    assert!(daemon.wait_for(WAIT, |s| s.idle_requests >= 2));
    player.shutdown();
    daemon.notify("player");
}

#[test]
fn shutdown_allows_at_most_one_more_idle_cycle() {
    let daemon = FakeDaemon::start();
    let player = connected_player(&daemon);

    assert!(daemon.wait_for(WAIT, |s| s.idle_requests >= 1));
    player.shutdown();
    assert!(!player.is_running());
    daemon.notify("player");

    std::thread::sleep(QUIET);
    assert_eq!(daemon.idle_requests(), 1);
}

#[test]
fn listener_starts_before_the_daemon_is_up() {
    let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = reserved.local_addr().unwrap().port();
    drop(reserved);

    let player = MpdPlayer::new(MpdSettings {
        reconnect_delay: Duration::from_millis(50),
        timeout: Duration::from_millis(500),
        ..MpdSettings::new("127.0.0.1", port)
    });
    player.start_client().unwrap();
    assert!(player.is_running());

    std::thread::sleep(Duration::from_millis(120));
    let daemon = FakeDaemon::start_at(port);
    daemon.state().volume = "48".to_string();

    assert!(daemon.wait_for(WAIT, |s| s.idle_requests >= 1));
    // Commands open the control connection on demand.
    assert_eq!(player.get_volume().unwrap(), Some(48));

    player.shutdown();
    daemon.notify("player");
}

#[test]
fn load_playlist_lists_titles_in_order() {
    let daemon = FakeDaemon::start();
    daemon.state().playlist = vec![
        ("jazz/01.flac".to_string(), Some("So What".to_string())),
        ("jazz/02%20Blue.flac".to_string(), None),
    ];
    let player = MpdPlayer::new(daemon.settings());

    let titles = player
        .load_playlist(&PlaylistDescriptor::new("jazz/mix.m3u"))
        .unwrap();

    assert_eq!(titles, vec!["So What", "02%20Blue.flac"]);
    let commands = daemon.commands();
    assert_eq!(&commands[..2], ["clear", "load jazz/mix.m3u"]);
}

#[test]
fn daemon_errors_are_reported_and_connection_kept() {
    let daemon = FakeDaemon::start();
    let player = MpdPlayer::new(daemon.settings());

    let err = player
        .load_playlist(&PlaylistDescriptor::new("missing"))
        .unwrap_err();
    assert!(matches!(err, PlayerError::DaemonAck { .. }));

    player.stop().unwrap();
    assert_eq!(daemon.commands().last().map(String::as_str), Some("stop"));
}

#[test]
fn stop_without_connection_is_a_noop() {
    let player = MpdPlayer::new(MpdSettings::new("127.0.0.1", 9));
    assert!(player.stop().is_ok());
}

#[test]
fn track_time_is_none_when_unreachable() {
    let daemon = FakeDaemon::start();
    daemon
        .state()
        .status
        .insert("duration".to_string(), "93.5".to_string());
    let player = MpdPlayer::new(daemon.settings());
    assert_eq!(player.get_current_track_time().as_deref(), Some("93.5"));

    let unreachable = MpdPlayer::new(MpdSettings {
        timeout: Duration::from_millis(200),
        ..MpdSettings::new("127.0.0.1", 9)
    });
    assert_eq!(unreachable.get_current_track_time(), None);
}

//! Verbs and framing of the daemon's line protocol.

pub const DEFAULT_MPD_PORT: u16 = 6600;

pub const EOL: &str = "\n";
pub const OK: &str = "OK";
pub const ACK: &str = "ACK";
/// Greeting sent by the daemon when a connection opens.
pub const GREETING_PREFIX: &str = "OK MPD";

pub const COMMAND_LIST_BEGIN: &str = "command_list_begin";
pub const COMMAND_LIST_END: &str = "command_list_end";

pub const CLEAR: &str = "clear";
pub const ADD: &str = "add ";
pub const PLAY: &str = "play ";
pub const STOP: &str = "stop";
pub const PAUSE: &str = "pause 1";
pub const RESUME: &str = "pause 0";
pub const SET_VOLUME: &str = "setvol ";
pub const MUTE: &str = "setvol 0";
pub const STATUS: &str = "status";
pub const CURRENT_SONG: &str = "currentsong";
pub const IDLE: &str = "idle";
pub const SEEK_CURRENT: &str = "seekcur ";
pub const LOAD_PLAYLIST: &str = "load ";
pub const PLAYLIST: &str = "playlist";
pub const PLAYLIST_INFO: &str = "playlistinfo ";

// Subsystems named in `changed:` lines of an idle answer
pub const SUBSYSTEM_MIXER: &str = "mixer";
pub const SUBSYSTEM_PLAYER: &str = "player";
pub const SUBSYSTEM_PLAYLIST: &str = "playlist";

/// Volume value reported by the daemon when no mixer is available.
pub const VOLUME_UNAVAILABLE: &str = "-1";

pub fn play_index(index: u32) -> String {
    format!("{}{}", PLAY, index)
}

pub fn set_volume(level: u8) -> String {
    format!("{}{}", SET_VOLUME, level)
}

pub fn seek_current(position: &str) -> String {
    format!("{}{}", SEEK_CURRENT, position)
}

pub fn load_playlist(path: &str) -> String {
    format!("{}{}", LOAD_PLAYLIST, path)
}

pub fn playlist_info(index: usize) -> String {
    format!("{}{}", PLAYLIST_INFO, index)
}

/// Batch replacing the playlist with `url` and starting it.
///
/// The daemon executes the list atomically, so no status query can observe
/// a cleared but not yet refilled playlist.
pub fn replace_and_play(url: &str) -> String {
    let mut batch = String::new();
    batch.push_str(COMMAND_LIST_BEGIN);
    batch.push_str(EOL);
    batch.push_str(CLEAR);
    batch.push_str(EOL);
    batch.push_str(ADD);
    batch.push_str(url);
    batch.push_str(EOL);
    batch.push_str(&play_index(0));
    batch.push_str(EOL);
    batch.push_str(COMMAND_LIST_END);
    batch.push_str(EOL);
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_and_play_framing() {
        assert_eq!(
            replace_and_play("http://example.com/stream.mp3"),
            "command_list_begin\nclear\nadd http://example.com/stream.mp3\nplay 0\ncommand_list_end\n"
        );
    }

    #[test]
    fn test_single_commands() {
        assert_eq!(play_index(3), "play 3");
        assert_eq!(set_volume(42), "setvol 42");
        assert_eq!(seek_current("1.02.03"), "seekcur 1.02.03");
        assert_eq!(playlist_info(0), "playlistinfo 0");
        assert_eq!(load_playlist("jazz/mix.m3u"), "load jazz/mix.m3u");
    }
}

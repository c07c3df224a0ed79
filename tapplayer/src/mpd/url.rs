//! Derivation of the URL handed to the daemon's `add` command.

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::errors::PlayerError;

pub const CDDA_SCHEME: &str = "cdda://";
const CDDA_DRIVE_PREFIX: &str = "cdda:///";
const CDDA_TRACK_KEY: &str = "track=";

/// Characters escaped in HTTP(S) URLs. Reserved URL delimiters and `%`
/// pass through so already valid URLs are left untouched.
const HTTP_URL: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

pub fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

pub fn encode_http_url(url: &str) -> String {
    utf8_percent_encode(url, HTTP_URL).to_string()
}

/// Builds the daemon-relative path of `file_name` stored in `folder`.
///
/// Windows separators are turned into `/` and `music_folder`, the daemon's
/// music root, is stripped so the daemon resolves the path itself.
pub fn local_path(folder: &str, file_name: &str, music_folder: &str) -> String {
    let folder = folder.replace('\\', "/");
    let file_name = file_name.replace('\\', "/");

    let joined = if folder.is_empty() {
        file_name
    } else if folder.ends_with('/') {
        format!("{}{}", folder, file_name)
    } else {
        format!("{}/{}", folder, file_name)
    };

    let root = music_folder.replace('\\', "/");
    let root = root.trim_end_matches('/');
    let relative = if root.is_empty() {
        joined.as_str()
    } else {
        joined.strip_prefix(root).unwrap_or(&joined)
    };

    relative.trim_start_matches('/').to_string()
}

/// Last `/`-separated segment of a daemon file path.
pub fn trailing_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Trailing segment with percent escapes decoded.
pub fn decoded_file_name(path: &str) -> String {
    percent_decode_str(trailing_segment(path))
        .decode_utf8_lossy()
        .into_owned()
}

/// Optical-disc track selected by a `"<drive uri> track=<n>"` descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CdTrack {
    /// Device path, e.g. `/dev/sr0`.
    pub device: String,
    /// Drive label used in fallback titles.
    pub drive_name: String,
    pub track_id: String,
}

impl CdTrack {
    /// Parses a companion descriptor such as `cdda:///dev/sr0 track=3`.
    pub fn parse(descriptor: &str) -> Result<Self, PlayerError> {
        let mut parts = descriptor.split_whitespace();
        let drive = parts.next().unwrap_or_default();
        let track = parts.next().unwrap_or_default();

        let Some(device) = drive.strip_prefix(CDDA_SCHEME) else {
            return Err(PlayerError::InvalidUrl(format!(
                "Optical disc descriptor without {} scheme: {}",
                CDDA_SCHEME, descriptor
            )));
        };
        let Some(track_id) = track.strip_prefix(CDDA_TRACK_KEY) else {
            return Err(PlayerError::InvalidUrl(format!(
                "Optical disc descriptor without track number: {}",
                descriptor
            )));
        };
        if track_id.is_empty() || !track_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(PlayerError::InvalidUrl(format!(
                "Invalid optical disc track '{}' in {}",
                track_id, descriptor
            )));
        }

        let device = device.trim_end_matches('/');
        Ok(CdTrack {
            device: format!("/{}", device.trim_start_matches('/')),
            drive_name: drive
                .strip_prefix(CDDA_DRIVE_PREFIX)
                .unwrap_or(device)
                .trim_end_matches('/')
                .to_string(),
            track_id: track_id.to_string(),
        })
    }

    /// URL the daemon plays for this track.
    pub fn url(&self) -> String {
        format!("{}{}/{}", CDDA_SCHEME, self.device, self.track_id)
    }

    /// 1-based track number.
    pub fn number(&self) -> Option<usize> {
        self.track_id.parse().ok()
    }

    /// Display title: the pre-resolved name when known, otherwise drive
    /// name, label and track id.
    pub fn title(&self, track_names: &[String], label: &str) -> String {
        self.number()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| track_names.get(index))
            .cloned()
            .unwrap_or_else(|| format!("{}{} {}", self.drive_name, label, self.track_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_urls() {
        assert!(is_http("http://example.com/stream.mp3"));
        assert!(is_http("https://example.com/live"));
        assert!(!is_http("music/jazz/a.flac"));
        assert_eq!(
            encode_http_url("http://example.com/stream.mp3"),
            "http://example.com/stream.mp3"
        );
        assert_eq!(
            encode_http_url("http://radio.example/my station?id=4&q=a%20b"),
            "http://radio.example/my%20station?id=4&q=a%20b"
        );
    }

    #[test]
    fn test_local_path() {
        assert_eq!(
            local_path("/home/pi/music/jazz", "so what.flac", "/home/pi/music"),
            "jazz/so what.flac"
        );
        assert_eq!(
            local_path("C:\\music\\books\\", "ch1.mp3", "C:\\music"),
            "books/ch1.mp3"
        );
        assert_eq!(local_path("jazz", "a.mp3", ""), "jazz/a.mp3");
    }

    #[test]
    fn test_file_names() {
        assert_eq!(trailing_segment("books/moby/01%20Loomings.mp3"), "01%20Loomings.mp3");
        assert_eq!(decoded_file_name("books/moby/01%20Loomings.mp3"), "01 Loomings.mp3");
        assert_eq!(trailing_segment("single.mp3"), "single.mp3");
    }

    #[test]
    fn test_cd_descriptor() {
        let track = CdTrack::parse("cdda:///dev/sr0 track=3").unwrap();
        assert_eq!(track.device, "/dev/sr0");
        assert_eq!(track.drive_name, "dev/sr0");
        assert_eq!(track.track_id, "3");
        assert_eq!(track.url(), "cdda:///dev/sr0/3");
    }

    #[test]
    fn test_cd_descriptor_with_separator_run() {
        let track = CdTrack::parse("cdda:///dev/sr0//// track=12").unwrap();
        assert_eq!(track.device, "/dev/sr0");
        assert_eq!(track.track_id, "12");
    }

    #[test]
    fn test_cd_descriptor_errors() {
        assert!(CdTrack::parse("/dev/sr0 track=3").is_err());
        assert!(CdTrack::parse("cdda:///dev/sr0").is_err());
        assert!(CdTrack::parse("cdda:///dev/sr0 track=x").is_err());
    }

    #[test]
    fn test_cd_title() {
        let track = CdTrack::parse("cdda:///dev/sr0 track=2").unwrap();
        let names = vec!["Intro".to_string(), "Blue in Green".to_string()];
        assert_eq!(track.title(&names, " Track"), "Blue in Green");
        assert_eq!(track.title(&[], " Track"), "dev/sr0 Track 2");
    }
}

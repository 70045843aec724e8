//! Line protocol spoken with the card reader.
//!
//! Inbound, the reader sends one newline-terminated record per scanned card.
//! Records starting with `spotify:album` or `spotify:track` are playback
//! requests; everything else is noise from the peripheral and is ignored.
//!
//! Outbound, the bridge sends two bare text writes (no newline) per track
//! change: `Song: <title>` followed by `By: <artist>`.

use unicode_width::UnicodeWidthChar;

/// Length of the URI prefix inspected on every inbound record.
pub const PREFIX_LEN: usize = 13;
pub const ALBUM_PREFIX: &str = "spotify:album";
pub const TRACK_PREFIX: &str = "spotify:track";

/// A playback request decoded from a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardCommand {
    /// Start playing a collection; carries the full line as context URI.
    PlayContext(String),
    /// Start playing one track; carries the full line as track URI.
    PlayTrack(String),
}

impl CardCommand {
    /// Dispatch on the first 13 characters of an already-decoded line.
    pub fn parse(line: &str) -> Option<Self> {
        let prefix: String = line.chars().take(PREFIX_LEN).collect();
        match prefix.as_str() {
            ALBUM_PREFIX => Some(Self::PlayContext(line.to_string())),
            TRACK_PREFIX => Some(Self::PlayTrack(line.to_string())),
            _ => None,
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            Self::PlayContext(uri) | Self::PlayTrack(uri) => uri,
        }
    }
}

/// Strip trailing whitespace (line endings included) and decode as UTF-8.
pub fn decode_line(raw: &[u8]) -> Result<String, std::str::Utf8Error> {
    let end = raw
        .iter()
        .rposition(|&b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c))
        .map(|i| i + 1)
        .unwrap_or(0);
    std::str::from_utf8(&raw[..end]).map(str::to_string)
}

/// The two lines shown on the peripheral for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLines {
    pub song: String,
    pub artist: String,
    /// `Song: <title> by <artist>`; compared against the last one sent.
    pub summary: String,
}

impl DisplayLines {
    pub fn new(title: &str, artist: &str) -> Self {
        Self {
            song: format!("Song: {}", title),
            artist: format!("By: {}", artist),
            summary: format!("Song: {} by {}", title, artist),
        }
    }

    /// Clip both display lines to `max_columns`. The summary is left alone so
    /// change detection still sees the full text.
    pub fn fit(mut self, max_columns: usize) -> Self {
        if max_columns > 0 {
            self.song = clip_to_width(&self.song, max_columns);
            self.artist = clip_to_width(&self.artist, max_columns);
        }
        self
    }
}

/// Longest prefix of `s` that occupies at most `max_columns` columns.
pub fn clip_to_width(s: &str, max_columns: usize) -> String {
    let mut width = 0;
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > max_columns {
            break;
        }
        width += w;
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_line_is_context() {
        let cmd = CardCommand::parse("spotify:album:3x9FhzPXWEV0PPpC0rEcIT").unwrap();
        assert_eq!(
            cmd,
            CardCommand::PlayContext("spotify:album:3x9FhzPXWEV0PPpC0rEcIT".into())
        );
    }

    #[test]
    fn test_track_line_is_track() {
        let cmd = CardCommand::parse("spotify:track:1301WleyT98MSxVHPZCA6M").unwrap();
        assert_eq!(cmd.uri(), "spotify:track:1301WleyT98MSxVHPZCA6M");
        assert!(matches!(cmd, CardCommand::PlayTrack(_)));
    }

    #[test]
    fn test_other_lines_ignored() {
        for line in ["hello", "", "spotify:", "spotify:albu", "spotify:artist:xyz", "SPOTIFY:ALBUM:x"] {
            assert_eq!(CardCommand::parse(line), None, "line {:?}", line);
        }
    }

    #[test]
    fn test_bare_prefix_matches() {
        assert_eq!(
            CardCommand::parse("spotify:track"),
            Some(CardCommand::PlayTrack("spotify:track".into()))
        );
    }

    #[test]
    fn test_non_ascii_before_prefix_end() {
        assert_eq!(CardCommand::parse("spotify:albüm:x"), None);
    }

    #[test]
    fn test_decode_line_strips_line_endings() {
        assert_eq!(decode_line(b"spotify:track:abc\r\n").unwrap(), "spotify:track:abc");
        assert_eq!(decode_line(b"  padded \t\n").unwrap(), "  padded");
        assert_eq!(decode_line(b"\r\n").unwrap(), "");
        assert_eq!(decode_line(b"").unwrap(), "");
        assert_eq!(decode_line(b"spotify:album:x\x0b\x0c\r\n").unwrap(), "spotify:album:x");
    }

    #[test]
    fn test_decode_line_rejects_bad_utf8() {
        assert!(decode_line(&[0x73, 0xff, 0xfe, b'\n']).is_err());
    }

    #[test]
    fn test_display_lines() {
        let lines = DisplayLines::new("Hey Jude", "The Beatles");
        assert_eq!(lines.song, "Song: Hey Jude");
        assert_eq!(lines.artist, "By: The Beatles");
        assert_eq!(lines.summary, "Song: Hey Jude by The Beatles");
    }

    #[test]
    fn test_fit_clips_by_columns() {
        let lines = DisplayLines::new("Bohemian Rhapsody", "Queen").fit(16);
        assert_eq!(lines.song, "Song: Bohemian R");
        assert_eq!(lines.artist, "By: Queen");
        assert_eq!(lines.summary, "Song: Bohemian Rhapsody by Queen");

        let untouched = DisplayLines::new("Bohemian Rhapsody", "Queen").fit(0);
        assert_eq!(untouched.song, "Song: Bohemian Rhapsody");
    }

    #[test]
    fn test_clip_never_splits_wide_chars() {
        // Each CJK character is two columns wide.
        assert_eq!(clip_to_width("日本語", 5), "日本");
        assert_eq!(clip_to_width("abc", 10), "abc");
    }
}

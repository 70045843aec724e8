//! Shape of the "currently playing" payload returned by the Spotify Web API.
//!
//! Every field is optional so that odd payloads (podcast episodes, local
//! files, ads) deserialize fine and fail later, in [`PlayingSnapshot::track_text`],
//! with a precise [`MissingField`] instead of an opaque JSON error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentlyPlaying {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<u64>,
    /// "track", "episode", "ad" or "unknown".
    #[serde(default)]
    pub currently_playing_type: Option<String>,
    #[serde(default)]
    pub context: Option<PlayingContext>,
    #[serde(default)]
    pub item: Option<PlayingItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayingContext {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayingItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub artists: Option<Vec<Artist>>,
    #[serde(default)]
    pub album: Option<Album>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

/// Which part of the payload was absent when extracting display text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MissingField {
    #[error("response has no item")]
    Item,
    #[error("item.name is missing")]
    Title,
    #[error("item.artists[0].name is missing")]
    Artist,
}

/// The part of a poll result that is compared between iterations.
///
/// Progress and server timestamps move on every poll and are left out, so
/// two polls of the same paused or playing track compare equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayingSnapshot {
    pub is_playing: bool,
    pub playing_type: Option<String>,
    pub context_uri: Option<String>,
    pub item: Option<PlayingItem>,
}

impl CurrentlyPlaying {
    pub fn snapshot(&self) -> PlayingSnapshot {
        PlayingSnapshot {
            is_playing: self.is_playing,
            playing_type: self.currently_playing_type.clone(),
            context_uri: self.context.as_ref().and_then(|c| c.uri.clone()),
            item: self.item.clone(),
        }
    }
}

impl PlayingSnapshot {
    /// `(title, primary artist)` of the playing item.
    pub fn track_text(&self) -> Result<(String, String), MissingField> {
        let item = self.item.as_ref().ok_or(MissingField::Item)?;
        let title = item.name.clone().ok_or(MissingField::Title)?;
        let artist = item
            .artists
            .as_deref()
            .and_then(|artists| artists.first())
            .and_then(|a| a.name.clone())
            .ok_or(MissingField::Artist)?;
        Ok((title, artist))
    }

    pub fn item_uri(&self) -> Option<&str> {
        self.item.as_ref()?.uri.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> CurrentlyPlaying {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_track_text() {
        let cp = parse(serde_json::json!({
            "is_playing": true,
            "progress_ms": 1234,
            "currently_playing_type": "track",
            "item": {
                "name": "Hey Jude",
                "uri": "spotify:track:0aym2LBJBk9DAYuHHutrIl",
                "artists": [{ "name": "The Beatles" }, { "name": "Someone Else" }],
                "album": { "name": "Hey Jude" }
            }
        }));
        let snap = cp.snapshot();
        assert_eq!(
            snap.track_text().unwrap(),
            ("Hey Jude".to_string(), "The Beatles".to_string())
        );
        assert_eq!(snap.item_uri(), Some("spotify:track:0aym2LBJBk9DAYuHHutrIl"));
    }

    #[test]
    fn test_missing_fields() {
        let no_item = parse(serde_json::json!({ "is_playing": false, "item": null }));
        assert_eq!(no_item.snapshot().track_text(), Err(MissingField::Item));

        let no_name = parse(serde_json::json!({ "item": { "artists": [{ "name": "X" }] } }));
        assert_eq!(no_name.snapshot().track_text(), Err(MissingField::Title));

        let episode = parse(serde_json::json!({
            "currently_playing_type": "episode",
            "item": { "name": "Episode 12", "show": { "name": "A Podcast" } }
        }));
        assert_eq!(episode.snapshot().track_text(), Err(MissingField::Artist));

        let empty_artists = parse(serde_json::json!({ "item": { "name": "T", "artists": [] } }));
        assert_eq!(empty_artists.snapshot().track_text(), Err(MissingField::Artist));
    }

    #[test]
    fn test_snapshot_ignores_progress() {
        let item = serde_json::json!({ "name": "T", "artists": [{ "name": "A" }] });
        let a = parse(serde_json::json!({ "is_playing": true, "progress_ms": 1000, "item": item }));
        let b = parse(serde_json::json!({ "is_playing": true, "progress_ms": 5000, "item": item }));
        assert_ne!(a, b);
        assert_eq!(a.snapshot(), b.snapshot());

        let paused = parse(serde_json::json!({ "is_playing": false, "progress_ms": 5000, "item": item }));
        assert_ne!(a.snapshot(), paused.snapshot());
    }
}

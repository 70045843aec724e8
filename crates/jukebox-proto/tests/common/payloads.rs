//! Captured `GET /v1/me/player/currently-playing` bodies, trimmed of images
//! and market lists.

pub const TRACK: &str = r#"{
  "timestamp": 1692371012345,
  "context": {
    "external_urls": { "spotify": "https://open.spotify.com/album/3x9FhzPXWEV0PPpC0rEcIT" },
    "href": "https://api.spotify.com/v1/albums/3x9FhzPXWEV0PPpC0rEcIT",
    "type": "album",
    "uri": "spotify:album:3x9FhzPXWEV0PPpC0rEcIT"
  },
  "progress_ms": 81234,
  "item": {
    "album": {
      "album_type": "album",
      "artists": [{ "name": "Fleetwood Mac", "type": "artist", "uri": "spotify:artist:08GQAI4eElDnROBrJRGE0X" }],
      "name": "Rumours",
      "release_date": "1977-02-04",
      "type": "album",
      "uri": "spotify:album:3x9FhzPXWEV0PPpC0rEcIT"
    },
    "artists": [
      { "name": "Fleetwood Mac", "type": "artist", "uri": "spotify:artist:08GQAI4eElDnROBrJRGE0X" }
    ],
    "disc_number": 1,
    "duration_ms": 216773,
    "explicit": false,
    "is_local": false,
    "name": "Dreams - 2004 Remaster",
    "popularity": 85,
    "track_number": 2,
    "type": "track",
    "uri": "spotify:track:0ofHAoxe9vBkTCp2UQIavz"
  },
  "currently_playing_type": "track",
  "actions": { "disallows": { "resuming": true } },
  "is_playing": true
}"#;

pub const EPISODE: &str = r#"{
  "timestamp": 1692371099999,
  "context": null,
  "progress_ms": 5000,
  "item": {
    "description": "A show about things.",
    "duration_ms": 3600000,
    "name": "Episode 12: Things",
    "show": { "name": "The Things Podcast", "publisher": "Things Inc." },
    "type": "episode",
    "uri": "spotify:episode:512ojhOuo1ktJprKbVcKyQ"
  },
  "currently_playing_type": "episode",
  "is_playing": true
}"#;

pub const AD: &str = r#"{
  "timestamp": 1692371100000,
  "context": null,
  "progress_ms": 1200,
  "item": null,
  "currently_playing_type": "ad",
  "is_playing": true
}"#;

pub const LOCAL_FILE: &str = r#"{
  "timestamp": 1692371200000,
  "context": null,
  "progress_ms": 300,
  "item": {
    "album": { "name": "", "uri": null },
    "artists": [{ "name": "Home Recording", "uri": null }],
    "duration_ms": 120000,
    "is_local": true,
    "name": "demo take 3",
    "type": "track",
    "uri": "spotify:local:Home+Recording::demo+take+3:120"
  },
  "currently_playing_type": "track",
  "is_playing": false
}"#;

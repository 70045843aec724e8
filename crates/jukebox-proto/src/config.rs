use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

pub const ENV_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// How long one iteration waits for a card line before moving on.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Pause between the serial read and the now-playing poll.
    #[serde(default = "default_poll_pause_ms")]
    pub poll_pause_ms: u64,
    /// Pause between the two display writes; the peripheral needs time to
    /// process the first line.
    #[serde(default = "default_write_pause_ms")]
    pub write_pause_ms: u64,
    /// Consecutive unauthorized API responses before the bridge gives up.
    /// 0 keeps running forever.
    #[serde(default = "default_max_auth_failures")]
    pub max_auth_failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Widest line the peripheral can show, in terminal columns. 0 = no limit.
    #[serde(default = "default_max_columns")]
    pub max_columns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    /// Overridden by `SPOTIFY_CLIENT_ID` when set.
    #[serde(default)]
    pub client_id: String,
    /// Overridden by `SPOTIFY_CLIENT_SECRET` when set.
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Target device for playback; the active device is used when unset.
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_accounts_base")]
    pub accounts_base: String,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_pause_ms: default_poll_pause_ms(),
            write_pause_ms: default_write_pause_ms(),
            max_auth_failures: default_max_auth_failures(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_columns: default_max_columns(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            device_id: None,
            api_base: default_api_base(),
            accounts_base: default_accounts_base(),
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl BridgeConfig {
    pub fn poll_pause(&self) -> Duration {
        Duration::from_millis(self.poll_pause_ms)
    }

    pub fn write_pause(&self) -> Duration {
        Duration::from_millis(self.write_pause_ms)
    }
}

impl SpotifyConfig {
    /// Apply `SPOTIFY_CLIENT_ID` / `SPOTIFY_CLIENT_SECRET` on top of the file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_CLIENT_ID).ok(),
            std::env::var(ENV_CLIENT_SECRET).ok(),
        );
    }

    fn apply_overrides(&mut self, client_id: Option<String>, client_secret: Option<String>) {
        if let Some(id) = client_id.filter(|v| !v.trim().is_empty()) {
            self.client_id = id.trim().to_string();
        }
        if let Some(secret) = client_secret.filter(|v| !v.trim().is_empty()) {
            self.client_secret = secret.trim().to_string();
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

fn default_port() -> String {
    platform::DEFAULT_SERIAL_PORT.to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_timeout_ms() -> u64 {
    3000
}

fn default_poll_pause_ms() -> u64 {
    200
}

fn default_write_pause_ms() -> u64 {
    1100
}

fn default_max_auth_failures() -> u32 {
    5
}

fn default_max_columns() -> usize {
    64
}

fn default_redirect_uri() -> String {
    "http://127.0.0.1:3000/callback".to_string()
}

fn default_api_base() -> String {
    "https://api.spotify.com".to_string()
}

fn default_accounts_base() -> String {
    "https://accounts.spotify.com".to_string()
}

impl Config {
    /// Load the config file, writing one with defaults on first run, then
    /// layer the environment credentials on top.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml_str(&content)?
        } else {
            let config = Self::default();
            config.save()?;
            config
        };

        config.spotify.apply_env();
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

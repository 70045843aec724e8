use std::path::PathBuf;

/// Default serial device for the card reader when the config names none.
#[cfg(unix)]
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyACM0";

#[cfg(windows)]
pub const DEFAULT_SERIAL_PORT: &str = "COM4";

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/jukebox/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("jukebox")
    }
    #[cfg(windows)]
    {
        // Portable install: a `data` folder next to the executable wins
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let portable_data = exe_dir.join("data");
                if portable_data.exists() {
                    return portable_data;
                }
            }
        }

        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jukebox")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(windows)]
    {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                if exe_dir.join("config.toml").exists() {
                    return exe_dir.to_path_buf();
                }
            }
        }
    }

    // On macOS and Linux, always use ~/.config/jukebox/
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("jukebox")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jukebox")
    }
}

/// Where the OAuth token cache lives.
pub fn token_cache_path() -> PathBuf {
    data_dir().join("token.json")
}

pub fn log_path() -> PathBuf {
    data_dir().join("bridge.log")
}

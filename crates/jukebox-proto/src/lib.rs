pub mod config;
pub mod now_playing;
pub mod platform;
pub mod protocol;

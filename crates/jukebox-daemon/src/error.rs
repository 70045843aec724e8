use jukebox_proto::now_playing::MissingField;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong in one bridge iteration.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("cannot show track: {0}")]
    Data(#[from] MissingField),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("serial io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serial reader stopped")]
    ReaderGone,
    #[error("line is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
    #[error("no active playback device")]
    NoActiveDevice,
    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Coarse classification used in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Api,
    Data,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Api => "api",
            ErrorKind::Data => "data",
        })
    }
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Transport(_) => ErrorKind::Transport,
            BridgeError::Api(_) => ErrorKind::Api,
            BridgeError::Data(_) => ErrorKind::Data,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BridgeError::Api(ApiError::Unauthorized(_)))
    }

    /// The serial reader has exited; no further input can arrive.
    pub fn is_link_lost(&self) -> bool {
        matches!(self, BridgeError::Transport(TransportError::ReaderGone))
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BridgeError::Api(ApiError::RateLimited { retry_after }) => Some(*retry_after),
            _ => None,
        }
    }
}

//! The bridge loop.
//!
//! One iteration: read a card line (bounded wait) and dispatch it, pause,
//! poll what is playing and push it to the display when it changed.  Errors
//! end the iteration, never the loop, except for a lost card reader and the
//! auth give-up rule.

use jukebox_proto::config::Config;
use jukebox_proto::now_playing::PlayingSnapshot;
use jukebox_proto::protocol::{decode_line, CardCommand, DisplayLines};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{BridgeError, TransportError};
use crate::serial::LineLink;
use crate::spotify::PlaybackApi;

#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub read_timeout: Duration,
    pub poll_pause: Duration,
    pub write_pause: Duration,
    pub max_columns: usize,
    /// 0 = never give up.
    pub max_auth_failures: u32,
}

impl BridgeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            read_timeout: config.serial.read_timeout(),
            poll_pause: config.bridge.poll_pause(),
            write_pause: config.bridge.write_pause(),
            max_columns: config.display.max_columns,
            max_auth_failures: config.bridge.max_auth_failures,
        }
    }
}

/// Everything the loop needs, built once in `main`.
pub struct Bridge<L, A> {
    link: L,
    api: A,
    settings: BridgeSettings,
    /// Last poll result that was examined; `None` = nothing playing.
    last_seen: Option<PlayingSnapshot>,
    /// Summary of the last track pushed to the display.
    last_sent: String,
    auth_failures: u32,
    /// Set by a rate-limit response; honoured at the start of the next tick.
    hold_off: Option<Duration>,
}

impl<L: LineLink, A: PlaybackApi> Bridge<L, A> {
    pub fn new(link: L, api: A, settings: BridgeSettings) -> Self {
        Self {
            link,
            api,
            settings,
            last_seen: None,
            last_sent: String::new(),
            auth_failures: 0,
            hold_off: None,
        }
    }

    /// Run until `shutdown` resolves, the card reader disconnects or
    /// authorization keeps failing.
    pub async fn run<S>(mut self, shutdown: S) -> anyhow::Result<()>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Bridge running");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, leaving bridge loop (display: {:?})", self.last_sent);
                    return Ok(());
                }
                result = self.tick() => self.settle(result)?,
            }
        }
    }

    /// One full iteration.
    pub async fn tick(&mut self) -> Result<(), BridgeError> {
        if let Some(delay) = self.hold_off.take() {
            debug!("rate limited, holding off {:?}", delay);
            tokio::time::sleep(delay).await;
        }
        self.read_and_dispatch().await?;
        tokio::time::sleep(self.settings.poll_pause).await;
        self.poll_and_report().await?;
        Ok(())
    }

    /// Log the outcome of a tick. Stops the loop once the reader is gone or
    /// authorization keeps failing.
    fn settle(&mut self, result: Result<(), BridgeError>) -> anyhow::Result<()> {
        let err = match result {
            Ok(()) => {
                self.auth_failures = 0;
                return Ok(());
            }
            Err(e) => e,
        };

        error!(kind = %err.kind(), "bridge iteration failed: {}", err);

        if err.is_link_lost() {
            anyhow::bail!("card reader disconnected: {}", err);
        }

        if let Some(delay) = err.retry_after() {
            self.hold_off = Some(delay);
        }

        if err.is_unauthorized() {
            self.auth_failures += 1;
            let max = self.settings.max_auth_failures;
            warn!("authorization failure {}/{}", self.auth_failures, max);
            if max > 0 && self.auth_failures >= max {
                anyhow::bail!(
                    "giving up after {} consecutive authorization failures",
                    self.auth_failures
                );
            }
        } else if matches!(err, BridgeError::Data(_)) {
            // the API answered, so credentials are fine
            self.auth_failures = 0;
        }
        Ok(())
    }

    /// Read at most one card line and start playback for it.
    pub async fn read_and_dispatch(&mut self) -> Result<Option<CardCommand>, BridgeError> {
        let Some(raw) = self.link.read_line(self.settings.read_timeout).await? else {
            return Ok(None);
        };
        let line = decode_line(&raw).map_err(TransportError::from)?;
        let Some(cmd) = CardCommand::parse(&line) else {
            debug!("serial: ignoring {:?}", line);
            return Ok(None);
        };

        match &cmd {
            CardCommand::PlayContext(uri) => self.api.start_context(uri).await?,
            CardCommand::PlayTrack(uri) => {
                self.api.start_tracks(std::slice::from_ref(uri)).await?
            }
        }
        info!("card: started {}", cmd.uri());
        Ok(Some(cmd))
    }

    /// Poll the current track; returns whether the display was updated.
    pub async fn poll_and_report(&mut self) -> Result<bool, BridgeError> {
        let current = self.api.currently_playing().await?.map(|cp| cp.snapshot());
        if current == self.last_seen {
            return Ok(false);
        }

        let Some(snapshot) = &current else {
            debug!("nothing playing");
            self.last_seen = None;
            return Ok(false);
        };

        let (title, artist) = match snapshot.track_text() {
            Ok(text) => text,
            Err(missing) => {
                self.last_seen = current;
                return Err(missing.into());
            }
        };

        let lines = DisplayLines::new(&title, &artist).fit(self.settings.max_columns);
        let changed = lines.summary != self.last_sent;
        if changed {
            self.link.write_text(&lines.song).await?;
            tokio::time::sleep(self.settings.write_pause).await;
            self.link.write_text(&lines.artist).await?;
            info!("display: {}", lines.summary);
            self.last_sent = lines.summary;
        }
        self.last_seen = current;
        Ok(changed)
    }
}

//! Authorization-code flow for the first run.
//!
//! The user opens the printed authorize URL, Spotify redirects the browser to
//! `redirect_uri`, and a one-route HTTP listener on that address picks up the
//! code.  The code is exchanged for a token pair which is then cached, so the
//! flow only runs again if the cache is deleted or the refresh token revoked.

use anyhow::Context;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use jukebox_proto::config::SpotifyConfig;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::spotify::token::Token;
use crate::spotify::{request_token, SCOPES};

/// How long to wait for the user to finish in the browser.
const AUTH_TIMEOUT: Duration = Duration::from_secs(300);

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Cached token if there is one, otherwise run the browser flow and cache
/// the result.
pub async fn load_or_authorize(
    http: &Client,
    config: &SpotifyConfig,
    cache_path: &Path,
) -> anyhow::Result<Token> {
    match Token::load(cache_path) {
        Ok(Some(token)) => {
            info!("Using cached token from {:?}", cache_path);
            return Ok(token);
        }
        Ok(None) => info!("No token cache at {:?}, starting authorization", cache_path),
        Err(e) => warn!("Ignoring unreadable token cache {:?}: {}", cache_path, e),
    }

    let token = authorize(http, config).await?;
    token.save(cache_path)?;
    info!("Token cached at {:?}", cache_path);
    Ok(token)
}

pub async fn authorize(http: &Client, config: &SpotifyConfig) -> anyhow::Result<Token> {
    let state = random_state();
    let url = authorize_url(config, &state)?;
    let listener = CallbackListener::bind(&config.redirect_uri).await?;
    info!("Waiting for the authorization callback on {}", listener.local_addr()?);

    info!("Open this URL in a browser to authorize the jukebox:");
    info!("  {}", url);

    let code = listener.wait_for_code(state).await?;
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];
    let resp = request_token(http, config, &form)
        .await
        .context("exchanging authorization code")?;
    Token::from_response(resp, None, Utc::now())
        .context("token response did not include a refresh token")
}

pub fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

pub fn authorize_url(config: &SpotifyConfig, state: &str) -> anyhow::Result<Url> {
    let base = format!("{}/authorize", config.accounts_base.trim_end_matches('/'));
    Ok(Url::parse_with_params(
        &base,
        &[
            ("client_id", config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", SCOPES),
            ("state", state),
        ],
    )?)
}

// ── callback listener ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// `None` while the request carries neither a code nor an error.
pub fn check_callback(params: &CallbackParams, expected_state: &str) -> Option<Result<String, String>> {
    if let Some(error) = &params.error {
        return Some(Err(error.clone()));
    }
    let code = params.code.as_ref()?;
    if params.state.as_deref() != Some(expected_state) {
        return Some(Err("state mismatch".to_string()));
    }
    Some(Ok(code.clone()))
}

#[derive(Clone)]
struct CallbackState {
    expected_state: String,
    reply: Arc<Mutex<Option<oneshot::Sender<Result<String, String>>>>>,
}

async fn callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    let Some(outcome) = check_callback(&params, &state.expected_state) else {
        return Html("<p>Waiting for Spotify authorization…</p>");
    };
    let page = if outcome.is_ok() {
        "<p>Jukebox authorized. You can close this window.</p>"
    } else {
        "<p>Authorization failed. Check the jukebox log.</p>"
    };
    let sender = state.reply.lock().ok().and_then(|mut guard| guard.take());
    if let Some(tx) = sender {
        let _ = tx.send(outcome);
    }
    Html(page)
}

pub struct CallbackListener {
    listener: TcpListener,
    path: String,
}

impl CallbackListener {
    /// Listen on the host and port named by `redirect_uri`.
    pub async fn bind(redirect_uri: &str) -> anyhow::Result<Self> {
        let url = Url::parse(redirect_uri).context("invalid redirect_uri")?;
        let host = url.host_str().context("redirect_uri has no host")?.to_string();
        let port = url
            .port_or_known_default()
            .context("redirect_uri has no port")?;
        let listener = TcpListener::bind((host.as_str(), port))
            .await
            .with_context(|| format!("binding callback listener on {}:{}", host, port))?;
        Ok(Self {
            listener,
            path: url.path().to_string(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn wait_for_code(self, expected_state: String) -> anyhow::Result<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let state = CallbackState {
            expected_state,
            reply: Arc::new(Mutex::new(Some(reply_tx))),
        };
        let app = Router::new()
            .route(&self.path, get(callback))
            .with_state(state);

        let listener = self.listener;
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        let outcome = tokio::time::timeout(AUTH_TIMEOUT, reply_rx).await;
        let _ = stop_tx.send(());
        if tokio::time::timeout(SHUTDOWN_GRACE, server).await.is_err() {
            warn!("callback listener did not shut down in time");
        }

        match outcome {
            Err(_) => anyhow::bail!("no authorization callback within {:?}", AUTH_TIMEOUT),
            Ok(Err(_)) => anyhow::bail!("callback listener stopped"),
            Ok(Ok(Err(reason))) => anyhow::bail!("authorization refused: {}", reason),
            Ok(Ok(Ok(code))) => Ok(code),
        }
    }
}

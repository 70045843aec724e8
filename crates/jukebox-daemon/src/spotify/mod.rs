//! Spotify Web API client: the three player calls the bridge needs, plus
//! token refresh.

pub mod token;


use async_trait::async_trait;
use chrono::Utc;
use jukebox_proto::config::SpotifyConfig;
use jukebox_proto::now_playing::CurrentlyPlaying;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use token::{Token, TokenResponse};

pub const SCOPES: &str = "user-read-playback-state user-modify-playback-state";

/// Used when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote playback operations used by the bridge loop.
#[async_trait]
pub trait PlaybackApi: Send {
    /// Start playing a collection (album, playlist) by context URI.
    async fn start_context(&mut self, context_uri: &str) -> Result<(), ApiError>;

    /// Start playing an explicit list of track URIs.
    async fn start_tracks(&mut self, uris: &[String]) -> Result<(), ApiError>;

    /// `None` when nothing is playing.
    async fn currently_playing(&mut self) -> Result<Option<CurrentlyPlaying>, ApiError>;
}

pub fn http_client() -> Result<Client, ApiError> {
    Ok(Client::builder()
        .user_agent(concat!("jukebox/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

pub struct SpotifyClient {
    http: Client,
    config: SpotifyConfig,
    token: Token,
    /// Refreshed tokens are written here when set.
    cache_path: Option<PathBuf>,
}

impl SpotifyClient {
    pub fn new(
        config: SpotifyConfig,
        token: Token,
        cache_path: Option<PathBuf>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            http: http_client()?,
            config,
            token,
            cache_path,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v1{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Trade the refresh token for a new access token.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        debug!("spotify: refreshing access token");
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.token.refresh_token.as_str()),
        ];
        let resp = request_token(&self.http, &self.config, &form).await?;
        self.token = Token::from_response(resp, Some(&self.token), Utc::now())
            .ok_or_else(|| ApiError::Unauthorized("token response without refresh token".into()))?;
        info!("spotify: access token refreshed, expires {}", self.token.expires_at);

        if let Some(path) = &self.cache_path {
            if let Err(e) = self.token.save(path) {
                warn!("spotify: could not persist refreshed token: {}", e);
            }
        }
        Ok(())
    }

    /// Send an authorized request, refreshing the token first if it is about
    /// to expire and once more if the server still answers 401.
    async fn send_authed<F>(&mut self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder + Send,
    {
        if self.token.expires_soon(Utc::now()) {
            self.refresh().await?;
        }

        let resp = build(&self.http)
            .bearer_auth(&self.token.access_token)
            .send()
            .await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        debug!("spotify: 401, retrying with a fresh token");
        self.refresh().await?;
        Ok(build(&self.http)
            .bearer_auth(&self.token.access_token)
            .send()
            .await?)
    }

    async fn start_playback(&mut self, body: serde_json::Value) -> Result<(), ApiError> {
        let url = self.api_url("/me/player/play");
        let device_id = self.config.device_id.clone();
        let resp = self
            .send_authed(|http| {
                let req = http.put(&url).json(&body);
                match &device_id {
                    Some(id) => req.query(&[("device_id", id)]),
                    None => req,
                }
            })
            .await?;
        check_status(resp, true).await?;
        Ok(())
    }
}

#[async_trait]
impl PlaybackApi for SpotifyClient {
    async fn start_context(&mut self, context_uri: &str) -> Result<(), ApiError> {
        info!("spotify: start playback context={}", context_uri);
        self.start_playback(json!({ "context_uri": context_uri })).await
    }

    async fn start_tracks(&mut self, uris: &[String]) -> Result<(), ApiError> {
        info!("spotify: start playback uris={:?}", uris);
        self.start_playback(json!({ "uris": uris })).await
    }

    async fn currently_playing(&mut self) -> Result<Option<CurrentlyPlaying>, ApiError> {
        let url = self.api_url("/me/player/currently-playing");
        let resp = self.send_authed(|http| http.get(&url)).await?;
        let resp = check_status(resp, false).await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }
}

/// POST to the accounts service token endpoint with client credentials.
pub async fn request_token(
    http: &Client,
    config: &SpotifyConfig,
    form: &[(&str, &str)],
) -> Result<TokenResponse, ApiError> {
    let url = format!("{}/api/token", config.accounts_base.trim_end_matches('/'));
    let resp = http
        .post(&url)
        .basic_auth(&config.client_id, Some(&config.client_secret))
        .form(form)
        .send()
        .await?;

    let status = resp.status();
    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Unauthorized(body));
    }
    let resp = check_status(resp, false).await?;
    Ok(serde_json::from_str(&resp.text().await?)?)
}

/// Map non-success statuses onto [`ApiError`].
async fn check_status(resp: Response, is_play: bool) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    match status {
        StatusCode::UNAUTHORIZED => {
            let body = resp.text().await.unwrap_or_default();
            Err(ApiError::Unauthorized(body))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            Err(ApiError::RateLimited { retry_after })
        }
        StatusCode::NOT_FOUND if is_play => Err(ApiError::NoActiveDevice),
        _ => {
            let body = resp.text().await.unwrap_or_default();
            Err(ApiError::Status { status, body })
        }
    }
}

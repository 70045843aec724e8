//! OAuth token cache.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Refresh this long before the server-side expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: String,
}

/// Body of a successful `/api/token` response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    /// Present on code exchange; refresh responses usually omit it.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl Token {
    /// Build a token from a response.  `previous` supplies the refresh token
    /// when the server did not rotate it.
    pub fn from_response(
        resp: TokenResponse,
        previous: Option<&Token>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let refresh_token = resp
            .refresh_token
            .or_else(|| previous.map(|t| t.refresh_token.clone()))?;
        let scope = resp
            .scope
            .or_else(|| previous.map(|t| t.scope.clone()))
            .unwrap_or_default();
        Some(Self {
            access_token: resp.access_token,
            refresh_token,
            expires_at: now + Duration::seconds(resp.expires_in),
            scope,
        })
    }

    pub fn expires_soon(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now < Duration::seconds(EXPIRY_MARGIN_SECS)
    }

    /// `Ok(None)` when no cache file exists yet.
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!("token cache written to {:?}", path);
        Ok(())
    }
}

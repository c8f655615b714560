//! OAuth access tokens for the Gmail API.
//!
//! Either a raw access token from the environment, or an "authorized user"
//! token file (`token`, `refresh_token`, `client_id`, `client_secret`,
//! `token_uri`, `expiry`) that is refreshed with the `refresh_token` grant
//! when expired and written back in place. Interactive consent is not
//! handled here; the token file must already exist.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::MailboxError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed early.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Fields read from the authorized-user token file.
#[derive(Debug, Clone, Default, Deserialize)]
struct TokenFile {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
    #[serde(default)]
    expiry: Option<String>,
}

/// `refresh_token` grant response.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    secret: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => at - Duration::seconds(EXPIRY_SKEW_SECS) > now,
            None => true,
        }
    }
}

enum TokenSource {
    Static(SecretString),
    File(PathBuf),
}

/// Hands out a valid bearer token, refreshing from the token file as needed.
pub struct TokenProvider {
    source: TokenSource,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Always use this token; never touch the filesystem.
    pub fn from_access_token(token: SecretString) -> Self {
        Self {
            source: TokenSource::Static(token),
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    /// Load (and refresh) tokens from an authorized-user token file.
    pub fn from_token_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: TokenSource::File(path.into()),
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    /// A bearer token valid for at least the next minute.
    pub async fn access_token(&self) -> Result<SecretString, MailboxError> {
        let path = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::File(path) => path,
        };

        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref()
            && token.is_fresh(now)
        {
            return Ok(token.secret.clone());
        }

        let file = read_token_file(path).await?;
        let from_file = file.token.as_ref().filter(|t| !t.is_empty()).map(|t| CachedToken {
            secret: SecretString::from(t.clone()),
            expires_at: file.expiry.as_deref().and_then(parse_expiry),
        });

        let token = match from_file {
            Some(token) if token.is_fresh(now) => token,
            _ => self.refresh(path, &file).await?,
        };

        *cached = Some(token.clone());
        Ok(token.secret)
    }

    /// Run the `refresh_token` grant and persist the new token.
    async fn refresh(&self, path: &Path, file: &TokenFile) -> Result<CachedToken, MailboxError> {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            file.refresh_token.as_deref(),
            file.client_id.as_deref(),
            file.client_secret.as_deref(),
        ) else {
            return Err(MailboxError::Auth(format!(
                "token in {} is expired and cannot be refreshed \
                 (missing refresh_token, client_id or client_secret)",
                path.display()
            )));
        };

        let token_uri = file.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        debug!(token_uri, "Refreshing OAuth access token");

        let resp = self
            .http
            .post(token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| MailboxError::Auth(format!("token refresh request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MailboxError::Auth(format!(
                "token refresh rejected ({status}): {body}"
            )));
        }

        let refreshed: RefreshResponse = resp
            .json()
            .await
            .map_err(|e| MailboxError::Auth(format!("invalid token refresh response: {e}")))?;

        let expires_at = refreshed
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        write_refreshed_token(path, &refreshed.access_token, expires_at).await?;
        info!(path = %path.display(), "OAuth access token refreshed");

        Ok(CachedToken {
            secret: SecretString::from(refreshed.access_token),
            expires_at,
        })
    }
}

async fn read_token_file(path: &Path) -> Result<TokenFile, MailboxError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        MailboxError::Auth(format!("cannot read token file {}: {e}", path.display()))
    })?;
    serde_json::from_str(&contents)
        .map_err(|e| MailboxError::Auth(format!("invalid token file {}: {e}", path.display())))
}

/// Update `token` and `expiry` in place, keeping every other field.
async fn write_refreshed_token(
    path: &Path,
    access_token: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), MailboxError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        MailboxError::Auth(format!("cannot read token file {}: {e}", path.display()))
    })?;
    let mut value: serde_json::Value = serde_json::from_str(&contents)
        .map_err(|e| MailboxError::Auth(format!("invalid token file {}: {e}", path.display())))?;

    if let Some(obj) = value.as_object_mut() {
        obj.insert("token".into(), serde_json::Value::String(access_token.to_string()));
        match expires_at {
            Some(at) => {
                obj.insert("expiry".into(), serde_json::Value::String(at.to_rfc3339()));
            }
            None => {
                obj.remove("expiry");
            }
        }
    }

    let serialized = serde_json::to_string_pretty(&value)
        .map_err(|e| MailboxError::Auth(format!("cannot serialize token file: {e}")))?;
    tokio::fs::write(path, serialized).await.map_err(|e| {
        MailboxError::Auth(format!("cannot write token file {}: {e}", path.display()))
    })
}

/// Token expiry timestamps are RFC 3339, or naive ISO 8601 in UTC.
fn parse_expiry(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ndt| ndt.and_utc())
}

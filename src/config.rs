//! Configuration types, built from environment variables.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Gmail REST endpoint.
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

/// Top-level configuration for a triage run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the JSON rule document.
    pub rules_path: PathBuf,
    /// Path to the local message cache.
    pub db_path: PathBuf,
    /// Remote mailbox settings.
    pub gmail: GmailConfig,
    /// Settings for the `fetch` command.
    pub fetch: FetchConfig,
}

/// Gmail client settings.
#[derive(Debug, Clone)]
pub struct GmailConfig {
    /// REST base URL (overridable for tests and proxies).
    pub api_base: String,
    /// Mailbox owner; `me` is the authenticated user.
    pub user_id: String,
    /// OAuth authorized-user token file.
    pub token_path: PathBuf,
    /// Raw access token; when set the token file is never read.
    pub access_token: Option<SecretString>,
}

/// How many messages `fetch` pulls and with which search query.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub query: String,
    pub max_results: u32,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GMAIL_API_BASE.to_string(),
            user_id: "me".to_string(),
            token_path: PathBuf::from("token.json"),
            access_token: None,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            query: "in:inbox".to_string(),
            max_results: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("rules.json"),
            db_path: PathBuf::from("./data/emails.db"),
            gmail: GmailConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl Config {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_results = match lookup("MAIL_TRIAGE_FETCH_MAX") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| ConfigError::InvalidValue {
                key: "MAIL_TRIAGE_FETCH_MAX".into(),
                message: e.to_string(),
            })?,
            None => defaults.fetch.max_results,
        };

        Ok(Self {
            rules_path: lookup("MAIL_TRIAGE_RULES_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.rules_path),
            db_path: lookup("MAIL_TRIAGE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            gmail: GmailConfig {
                api_base: lookup("GMAIL_API_BASE")
                    .map(|s| s.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.gmail.api_base),
                user_id: lookup("GMAIL_USER_ID").unwrap_or(defaults.gmail.user_id),
                token_path: lookup("MAIL_TRIAGE_TOKEN_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.gmail.token_path),
                access_token: lookup("GMAIL_ACCESS_TOKEN")
                    .filter(|s| !s.trim().is_empty())
                    .map(SecretString::from),
            },
            fetch: FetchConfig {
                query: lookup("MAIL_TRIAGE_FETCH_QUERY").unwrap_or(defaults.fetch.query),
                max_results,
            },
        })
    }
}

//! Error types for mail-triage.

use std::path::PathBuf;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// The rule document could not be loaded. Always fatal for a run.
#[derive(Debug, thiserror::Error)]
pub enum RuleDocumentError {
    #[error("Failed to read rule document {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid rule document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Local message cache errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Remote mailbox errors (transport, API status, auth, payload decoding).
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl From<reqwest::Error> for MailboxError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MailboxError::Decode(e.to_string())
        } else {
            MailboxError::Transport(e.to_string())
        }
    }
}

//! Remote mailbox boundary: label reads and writes against the live mailbox.
//!
//! The rule engine only talks to the [`MailboxClient`] trait. [`GmailClient`]
//! is the REST implementation; tests substitute an in-memory recorder.

pub mod auth;
pub mod fetch;
pub mod gmail;
pub mod types;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::MailboxError;

pub use gmail::GmailClient;

/// System label marking a message as unread.
pub const UNREAD: &str = "UNREAD";
/// System label for the inbox.
pub const INBOX: &str = "INBOX";

/// A label as listed by the remote mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelInfo {
    pub id: String,
    pub name: String,
}

/// Label operations the rule engine needs from a remote mailbox.
///
/// Every call may fail with a transport or API error; callers treat such
/// failures as recoverable for the current unit of work only.
#[async_trait]
pub trait MailboxClient: Send + Sync {
    /// All labels currently defined in the mailbox.
    async fn list_labels(&self) -> Result<Vec<LabelInfo>, MailboxError>;

    /// Create a label with default visibility settings. Returns its id.
    async fn create_label(&self, name: &str) -> Result<String, MailboxError>;

    /// Live label ids currently attached to a message.
    async fn get_message_labels(&self, message_id: &str) -> Result<HashSet<String>, MailboxError>;

    /// Add and remove label ids on a message in one call.
    async fn modify_message_labels(
        &self,
        message_id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), MailboxError>;
}

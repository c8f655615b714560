//! Executes one action against one message.
//!
//! The message's labels are read live right before the write, never taken
//! from the cached record. Actions that would change nothing make no write.

use std::fmt;

use tracing::{info, warn};

use crate::error::MailboxError;
use crate::mailbox::{INBOX, MailboxClient, UNREAD};
use crate::rules::labels::{LabelMap, resolve_label};
use crate::rules::types::Action;

/// What applying an action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// One modify call was made with these label ids.
    Applied { add: Vec<String>, remove: Vec<String> },
    /// The message already had the target state; no write was made.
    NoChange,
    /// Unrecognized action; no remote call was made.
    Skipped,
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied { add, remove } => write!(f, "add={add:?} remove={remove:?}"),
            Self::NoChange => f.write_str("no change"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

/// Apply `action` to `message_id`, creating labels through `labels` as needed.
pub async fn apply_action(
    client: &dyn MailboxClient,
    message_id: &str,
    action: &Action,
    labels: &mut LabelMap,
) -> Result<ActionOutcome, MailboxError> {
    if let Action::Unknown(raw) = action {
        warn!(message_id, action = %raw, "Unknown action, skipping");
        return Ok(ActionOutcome::Skipped);
    }

    let current = client.get_message_labels(message_id).await?;

    let mut add = Vec::new();
    let mut remove = Vec::new();
    match action {
        Action::MarkUnread => {
            if !current.contains(UNREAD) {
                add.push(UNREAD.to_string());
            }
        }
        Action::MarkRead => {
            if current.contains(UNREAD) {
                remove.push(UNREAD.to_string());
            }
        }
        Action::MoveTo(label) => {
            add.push(resolve_label(client, label, labels).await?);
            if current.contains(INBOX) {
                remove.push(INBOX.to_string());
            }
        }
        Action::MoveToKeepingInbox(label) => {
            add.push(resolve_label(client, label, labels).await?);
        }
        Action::Unknown(_) => return Ok(ActionOutcome::Skipped),
    }

    if add.is_empty() && remove.is_empty() {
        info!(message_id, action = %action, "No changes needed");
        return Ok(ActionOutcome::NoChange);
    }

    client
        .modify_message_labels(message_id, &add, &remove)
        .await?;
    info!(message_id, action = %action, ?add, ?remove, "Applied action");

    Ok(ActionOutcome::Applied { add, remove })
}

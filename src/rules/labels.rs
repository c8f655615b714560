//! Label name to id resolution, memoized for the length of one run.

use std::collections::HashMap;

use tracing::info;

use crate::error::MailboxError;
use crate::mailbox::{LabelInfo, MailboxClient};

/// Label display name to remote label id.
///
/// Seeded once from the mailbox and grown as actions create labels. Owned by
/// a single run; nothing is shared between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    ids: HashMap<String, String>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_labels(labels: impl IntoIterator<Item = LabelInfo>) -> Self {
        Self {
            ids: labels.into_iter().map(|l| (l.name, l.id)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.ids.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, id: impl Into<String>) {
        self.ids.insert(name.into(), id.into());
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// List the mailbox's labels into a fresh map (one remote call).
pub async fn build_label_map(client: &dyn MailboxClient) -> Result<LabelMap, MailboxError> {
    Ok(LabelMap::from_labels(client.list_labels().await?))
}

/// Id for `name`, creating the label if the map doesn't know it yet.
pub async fn resolve_label(
    client: &dyn MailboxClient,
    name: &str,
    labels: &mut LabelMap,
) -> Result<String, MailboxError> {
    if let Some(id) = labels.get(name) {
        return Ok(id.to_string());
    }

    let id = client.create_label(name).await?;
    info!(label = %name, label_id = %id, "Created label");
    labels.insert(name, id.clone());
    Ok(id)
}

//! Rule document loading.
//!
//! The document is a JSON object with a top-level `rules` array. A missing
//! `rules` key is an empty rule set; anything unreadable or structurally
//! wrong is a [`RuleDocumentError`].

use std::path::Path;

use serde::Deserialize;

use crate::error::RuleDocumentError;
use crate::rules::types::Rule;

#[derive(Debug, Default, Deserialize)]
struct RuleDocument {
    #[serde(default)]
    rules: Vec<Rule>,
}

/// Read and parse the rule document at `path`.
pub async fn load_rules(path: &Path) -> Result<Vec<Rule>, RuleDocumentError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| RuleDocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_rules(&contents)
}

/// Parse a rule document from a JSON string.
pub fn parse_rules(json: &str) -> Result<Vec<Rule>, RuleDocumentError> {
    let doc: RuleDocument = serde_json::from_str(json)?;

    Ok(doc
        .rules
        .into_iter()
        .enumerate()
        .map(|(i, mut rule)| {
            if rule.id.is_empty() {
                rule.id = format!("rule-{}", i + 1);
            }
            rule
        })
        .collect())
}

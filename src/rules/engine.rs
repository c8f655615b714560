//! Engine driver: every cached message against every rule, in order.
//!
//! Only a rule document that can't be loaded stops a run. Store and
//! mailbox failures are logged and the run carries on with the next unit
//! of work.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::error::RuleDocumentError;
use crate::mailbox::MailboxClient;
use crate::rules::actions::{ActionOutcome, apply_action};
use crate::rules::labels::{LabelMap, build_label_map};
use crate::rules::loader::load_rules;
use crate::rules::matcher::matches_at;
use crate::rules::types::Rule;
use crate::store::MessageStore;

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rules: usize,
    pub messages: usize,
    /// (message, rule) pairs that matched.
    pub matches: usize,
    pub applied: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failures: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rules, {} messages, {} matches: {} applied, {} unchanged, {} skipped, {} failed",
            self.rules,
            self.messages,
            self.matches,
            self.applied,
            self.unchanged,
            self.skipped,
            self.failures
        )
    }
}

/// Applies a rule set to the cached messages through a mailbox client.
pub struct RuleEngine {
    store: Arc<dyn MessageStore>,
    mailbox: Arc<dyn MailboxClient>,
}

impl RuleEngine {
    pub fn new(store: Arc<dyn MessageStore>, mailbox: Arc<dyn MailboxClient>) -> Self {
        Self { store, mailbox }
    }

    /// Load the rule document at `rules_path` and run it.
    ///
    /// The document is loaded before any remote call is made.
    pub async fn run(&self, rules_path: &Path) -> Result<RunSummary, RuleDocumentError> {
        let rules = load_rules(rules_path).await?;
        Ok(self.run_rules(&rules).await)
    }

    /// Run an already-parsed rule set.
    pub async fn run_rules(&self, rules: &[Rule]) -> RunSummary {
        let messages = match self.store.fetch_all().await {
            Ok(messages) => messages,
            Err(e) => {
                error!(error = %e, "Failed to read cached messages");
                Vec::new()
            }
        };

        let mut labels = match build_label_map(self.mailbox.as_ref()).await {
            Ok(labels) => labels,
            Err(e) => {
                warn!(error = %e, "Failed to list labels, starting with an empty label map");
                LabelMap::new()
            }
        };

        info!(
            "Loaded {} rules; processing {} messages",
            rules.len(),
            messages.len()
        );

        let mut summary = RunSummary {
            rules: rules.len(),
            messages: messages.len(),
            ..Default::default()
        };
        let now = Utc::now();

        for message in &messages {
            for rule in rules {
                if !matches_at(rule, message, now) {
                    continue;
                }
                summary.matches += 1;
                info!(rule = %rule.id, message_id = %message.id, "Rule matched");

                for action in &rule.actions {
                    match apply_action(self.mailbox.as_ref(), &message.id, action, &mut labels)
                        .await
                    {
                        Ok(outcome) => {
                            debug!(
                                rule = %rule.id,
                                message_id = %message.id,
                                %action,
                                %outcome,
                                "Action finished"
                            );
                            match outcome {
                                ActionOutcome::Applied { .. } => summary.applied += 1,
                                ActionOutcome::NoChange => summary.unchanged += 1,
                                ActionOutcome::Skipped => summary.skipped += 1,
                            }
                        }
                        Err(e) => {
                            summary.failures += 1;
                            error!(
                                rule = %rule.id,
                                message_id = %message.id,
                                %action,
                                error = %e,
                                "Action failed"
                            );
                        }
                    }
                }
            }
        }

        summary
    }
}

//! Combines a rule's per-condition results into a match decision.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::rules::predicates::evaluate_condition_at;
use crate::rules::types::{MatchMode, Rule};
use crate::store::MessageRecord;

/// Whether `rule` matches `record` right now.
pub fn matches(rule: &Rule, record: &MessageRecord) -> bool {
    matches_at(rule, record, Utc::now())
}

/// Whether `rule` matches `record`, with an explicit `now`.
///
/// Every condition is evaluated. `all` over no conditions matches, `any`
/// over no conditions does not, and an unrecognized mode never matches.
pub fn matches_at(rule: &Rule, record: &MessageRecord, now: DateTime<Utc>) -> bool {
    let results: Vec<bool> = rule
        .conditions
        .iter()
        .map(|condition| evaluate_condition_at(record, condition, now))
        .collect();

    match &rule.collection_predicate {
        MatchMode::All => results.iter().all(|&r| r),
        MatchMode::Any => results.iter().any(|&r| r),
        MatchMode::Unrecognized(mode) => {
            debug!(
                rule = %rule.id,
                mode = %mode,
                "Unrecognized collection predicate, rule skipped"
            );
            false
        }
    }
}

//! Rule engine: declarative rules evaluated against cached messages, with
//! matches turned into label changes on the remote mailbox.

pub mod actions;
pub mod engine;
pub mod labels;
pub mod loader;
pub mod matcher;
pub mod predicates;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use actions::{ActionOutcome, apply_action};
pub use engine::{RuleEngine, RunSummary};
pub use labels::{LabelMap, build_label_map, resolve_label};
pub use loader::{load_rules, parse_rules};
pub use matcher::{matches, matches_at};
pub use predicates::{evaluate_condition, evaluate_condition_at, parse_email_date};
pub use types::{Action, Condition, ConditionField, ConditionValue, MatchMode, Predicate, Rule};

//! Mail Triage: rule-driven labelling for a Gmail mailbox.

pub mod config;
pub mod error;
pub mod mailbox;
pub mod rules;
pub mod store;

//! Rule document types.
//!
//! Every enum here is read from a plain JSON string. Unrecognized
//! strings are kept as `Unknown` variants rather than rejected: a rule with
//! an unknown field or predicate simply never matches, and an unknown action
//! is reported and skipped when it would run.
//!
//! Optional rule keys are read leniently: a value of the wrong JSON type
//! falls back to the key's default instead of failing the whole document.

use std::borrow::Cow;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Which message field a condition reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ConditionField {
    FromAddress,
    Subject,
    Body,
    ReceivedAt,
    Unknown(String),
}

impl From<String> for ConditionField {
    fn from(s: String) -> Self {
        match s.as_str() {
            "from_email" | "from" => Self::FromAddress,
            "subject" => Self::Subject,
            "message" | "body" => Self::Body,
            "received_datetime" | "date_received" => Self::ReceivedAt,
            _ => Self::Unknown(s),
        }
    }
}

/// How a condition compares its field against its value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Predicate {
    Contains,
    NotContains,
    Equals,
    NotEquals,
    OlderThanDays,
    NewerThanDays,
    LessThanMonths,
    GreaterThanMonths,
    Unknown(String),
}

impl From<String> for Predicate {
    fn from(s: String) -> Self {
        match s.as_str() {
            "contains" => Self::Contains,
            "not_contains" => Self::NotContains,
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "older_than_days" => Self::OlderThanDays,
            "newer_than_days" => Self::NewerThanDays,
            "less_than_months" => Self::LessThanMonths,
            "greater_than_months" => Self::GreaterThanMonths,
            _ => Self::Unknown(s),
        }
    }
}

impl Predicate {
    /// Predicates that apply to the text fields.
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            Self::Contains | Self::NotContains | Self::Equals | Self::NotEquals
        )
    }

    /// Predicates that apply to `received_datetime`.
    pub fn is_date(&self) -> bool {
        matches!(
            self,
            Self::OlderThanDays
                | Self::NewerThanDays
                | Self::LessThanMonths
                | Self::GreaterThanMonths
        )
    }
}

/// A condition's comparison value: JSON string or integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    Integer(i64),
    Text(String),
}

impl ConditionValue {
    /// Text form, with integers rendered in decimal.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Integer(n) => Cow::Owned(n.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
        }
    }

    /// Integer form. `None` for text that isn't a whole number.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// One field/predicate/value test.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Condition {
    pub field: ConditionField,
    pub predicate: Predicate,
    #[serde(default, deserialize_with = "lenient_value")]
    pub value: Option<ConditionValue>,
}

/// How a rule combines its conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MatchMode {
    #[default]
    All,
    Any,
    /// Never matches.
    Unrecognized(String),
}

impl From<String> for MatchMode {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "all" => Self::All,
            "any" => Self::Any,
            _ => Self::Unrecognized(s),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Any => f.write_str("any"),
            Self::Unrecognized(s) => f.write_str(s),
        }
    }
}

/// A named set of conditions plus the actions to run when they match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Rule {
    /// Filled in as `rule-<n>` by the loader when absent.
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_match_mode")]
    pub collection_predicate: MatchMode,
    #[serde(default, deserialize_with = "lenient_conditions")]
    pub conditions: Vec<Condition>,
    #[serde(default, deserialize_with = "lenient_actions")]
    pub actions: Vec<Action>,
}

/// Strings as-is, numbers in decimal, anything else empty.
fn lenient_id<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_match_mode<'de, D: Deserializer<'de>>(de: D) -> Result<MatchMode, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => MatchMode::from(s),
        _ => MatchMode::All,
    })
}

/// A list is parsed strictly; null or any other type is an empty list.
fn lenient_conditions<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Condition>, D::Error> {
    match Value::deserialize(de)? {
        list @ Value::Array(_) => serde_json::from_value(list).map_err(D::Error::custom),
        _ => Ok(Vec::new()),
    }
}

/// Non-string entries become `Action::Unknown` holding their JSON text.
fn lenient_actions<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Action>, D::Error> {
    let Value::Array(items) = Value::deserialize(de)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Action::from(s),
            other => Action::Unknown(other.to_string()),
        })
        .collect())
}

fn lenient_value<'de, D: Deserializer<'de>>(de: D) -> Result<Option<ConditionValue>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => Some(ConditionValue::Text(s)),
        Value::Number(n) => n.as_i64().map(ConditionValue::Integer),
        _ => None,
    })
}

const MOVE_PREFIX: &str = "move_message:";
const MOVE_KEEP_INBOX_PREFIX: &str = "move_message_keep_inbox:";

/// A label mutation, parsed once from its string encoding at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `mark_read`
    MarkRead,
    /// `mark_unread`
    MarkUnread,
    /// `move_message:<label>`: add the label, drop INBOX.
    MoveTo(String),
    /// `move_message_keep_inbox:<label>`: add the label only.
    MoveToKeepingInbox(String),
    /// Anything else, kept verbatim for diagnostics.
    Unknown(String),
}

impl Action {
    pub fn parse(raw: &str) -> Self {
        if raw == "mark_read" {
            return Self::MarkRead;
        }
        if raw == "mark_unread" {
            return Self::MarkUnread;
        }

        let labelled = |label: &str, make: fn(String) -> Self| {
            let label = label.trim();
            if label.is_empty() {
                Self::Unknown(raw.to_string())
            } else {
                make(label.to_string())
            }
        };

        if let Some(label) = raw.strip_prefix(MOVE_KEEP_INBOX_PREFIX) {
            labelled(label, Self::MoveToKeepingInbox)
        } else if let Some(label) = raw.strip_prefix(MOVE_PREFIX) {
            labelled(label, Self::MoveTo)
        } else {
            Self::Unknown(raw.to_string())
        }
    }
}

impl From<String> for Action {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkRead => f.write_str("mark_read"),
            Self::MarkUnread => f.write_str("mark_unread"),
            Self::MoveTo(label) => write!(f, "{MOVE_PREFIX}{label}"),
            Self::MoveToKeepingInbox(label) => write!(f, "{MOVE_KEEP_INBOX_PREFIX}{label}"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

//! Per-condition evaluation against a cached message.
//!
//! Evaluation is total: unknown fields, mismatched field/predicate pairs,
//! unparseable dates and non-numeric date thresholds all yield `false`.

use chrono::{DateTime, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::rules::types::{Condition, ConditionField, Predicate};
use crate::store::MessageRecord;

/// Evaluate one condition against one message, relative to the current time.
pub fn evaluate_condition(record: &MessageRecord, condition: &Condition) -> bool {
    evaluate_condition_at(record, condition, Utc::now())
}

/// Evaluate one condition with an explicit `now` for the date predicates.
pub fn evaluate_condition_at(
    record: &MessageRecord,
    condition: &Condition,
    now: DateTime<Utc>,
) -> bool {
    let predicate = &condition.predicate;

    match &condition.field {
        ConditionField::ReceivedAt if predicate.is_date() => {
            let Some(received) = parse_email_date(&record.received_at) else {
                return false;
            };
            let threshold = match &condition.value {
                None => 0,
                Some(value) => match value.as_integer() {
                    Some(n) => n,
                    None => return false,
                },
            };
            eval_date(received.with_timezone(&Utc), predicate, threshold, now)
        }
        ConditionField::FromAddress | ConditionField::Subject | ConditionField::Body
            if predicate.is_string() =>
        {
            let text = match &condition.field {
                ConditionField::FromAddress => record.from_address.as_str(),
                ConditionField::Subject => record.subject.as_str(),
                _ => record.body.as_str(),
            };
            let value = condition
                .value
                .as_ref()
                .map(|v| v.as_text())
                .unwrap_or_default();
            eval_string(text, predicate, &value)
        }
        _ => false,
    }
}

/// Case-insensitive string comparison.
pub fn eval_string(field_text: &str, predicate: &Predicate, value: &str) -> bool {
    let text = field_text.to_lowercase();
    let value = value.to_lowercase();

    match predicate {
        Predicate::Contains => text.contains(&value),
        Predicate::NotContains => !text.contains(&value),
        Predicate::Equals => text == value,
        Predicate::NotEquals => text != value,
        _ => false,
    }
}

/// Age comparison of a received timestamp against `now`.
///
/// `newer_than_days` deliberately uses the same comparison as
/// `older_than_days` (`received < now - n days`); existing rule sets depend
/// on that behavior.
pub fn eval_date(
    received: DateTime<Utc>,
    predicate: &Predicate,
    n: i64,
    now: DateTime<Utc>,
) -> bool {
    match predicate {
        Predicate::OlderThanDays | Predicate::NewerThanDays => {
            days_before(now, n).is_some_and(|cutoff| received < cutoff)
        }
        Predicate::LessThanMonths => months_before(now, n).is_some_and(|cutoff| received > cutoff),
        Predicate::GreaterThanMonths => {
            months_before(now, n).is_some_and(|cutoff| received < cutoff)
        }
        _ => false,
    }
}

fn days_before(now: DateTime<Utc>, n: i64) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(TimeDelta::try_days(n)?)
}

fn months_before(now: DateTime<Utc>, n: i64) -> Option<DateTime<Utc>> {
    let months = Months::new(u32::try_from(n.unsigned_abs()).ok()?);
    if n >= 0 {
        now.checked_sub_months(months)
    } else {
        now.checked_add_months(months)
    }
}

/// Parse a stored `Date` value.
///
/// Tries the email header form (RFC 2822, with or without a trailing
/// comment such as `(UTC)`), then ISO 8601 with or without an offset, then a
/// bare date. Timestamps without an offset are taken as UTC.
pub fn parse_email_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt);
    }
    if let Some(idx) = s.rfind('(')
        && s.ends_with(')')
        && let Ok(dt) = DateTime::parse_from_rfc2822(s[..idx].trim_end())
    {
        return Some(dt);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc().fixed_offset());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc().fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::types::ConditionValue;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 1, 12, 0, 0).unwrap()
    }

    fn record() -> MessageRecord {
        MessageRecord {
            id: "m1".into(),
            from_address: "Kruthik <kruthikbv4@gmail.com>".into(),
            to_address: "me@example.com".into(),
            subject: "HappyFox Assignment".into(),
            body: "please finish this".into(),
            received_at: "Wed, 20 Nov 2024 10:00:00 +0530".into(),
            label_ids: "INBOX".into(),
        }
    }

    fn cond(field: &str, predicate: &str, value: Option<ConditionValue>) -> Condition {
        Condition {
            field: field.to_string().into(),
            predicate: predicate.to_string().into(),
            value,
        }
    }

    fn text(s: &str) -> Option<ConditionValue> {
        Some(ConditionValue::Text(s.into()))
    }

    fn int(n: i64) -> Option<ConditionValue> {
        Some(ConditionValue::Integer(n))
    }

    #[test]
    fn string_predicates_are_case_insensitive() {
        let msg = MessageRecord {
            subject: "HELLO".into(),
            ..Default::default()
        };
        assert!(evaluate_condition(&msg, &cond("subject", "contains", text("hello"))));
        assert!(evaluate_condition(&msg, &cond("subject", "equals", text("Hello"))));
        assert!(!evaluate_condition(&msg, &cond("subject", "not_equals", text("hello"))));
    }

    #[test]
    fn string_predicates_per_field() {
        let msg = record();
        assert!(evaluate_condition(&msg, &cond("from_email", "contains", text("gmail.com"))));
        assert!(evaluate_condition(&msg, &cond("subject", "contains", text("assignment"))));
        assert!(evaluate_condition(&msg, &cond("message", "contains", text("finish"))));
        assert!(evaluate_condition(&msg, &cond("message", "not_contains", text("zoom"))));
        assert!(!evaluate_condition(&msg, &cond("subject", "equals", text("assignment"))));
    }

    #[test]
    fn contains_and_not_contains_are_complements() {
        let msg = record();
        for value in ["happyfox", "zoom", "ASSIGN", ""] {
            let c = evaluate_condition(&msg, &cond("subject", "contains", text(value)));
            let nc = evaluate_condition(&msg, &cond("subject", "not_contains", text(value)));
            assert_ne!(c, nc, "value {value:?}");
        }
    }

    #[test]
    fn empty_field_and_empty_value() {
        let msg = MessageRecord::default();
        assert!(evaluate_condition(&msg, &cond("subject", "contains", text(""))));
        assert!(!evaluate_condition(&msg, &cond("subject", "not_contains", text(""))));
        assert!(evaluate_condition(&msg, &cond("subject", "contains", None)));
        assert!(evaluate_condition(&msg, &cond("subject", "equals", None)));
    }

    #[test]
    fn integer_value_compares_as_text() {
        let msg = MessageRecord {
            subject: "Invoice 2024".into(),
            ..Default::default()
        };
        assert!(evaluate_condition(&msg, &cond("subject", "contains", int(2024))));
    }

    #[test]
    fn unknown_field_or_predicate_is_false() {
        let msg = record();
        assert!(!evaluate_condition(&msg, &cond("cc", "contains", text(""))));
        assert!(!evaluate_condition(&msg, &cond("subject", "starts_with", text("Happy"))));
    }

    #[test]
    fn mismatched_pairs_are_false() {
        let msg = record();
        assert!(!evaluate_condition(&msg, &cond("subject", "older_than_days", int(0))));
        assert!(!evaluate_condition(&msg, &cond("received_datetime", "contains", text("Nov"))));
        assert!(!evaluate_condition(&msg, &cond("received_datetime", "not_contains", text("x"))));
    }

    #[test]
    fn older_than_days() {
        let msg = record();
        // Received 2024-11-20 04:30 UTC, now is 2024-12-01 12:00 UTC.
        assert!(evaluate_condition_at(
            &msg,
            &cond("received_datetime", "older_than_days", int(5)),
            now()
        ));
        assert!(!evaluate_condition_at(
            &msg,
            &cond("received_datetime", "older_than_days", int(20)),
            now()
        ));
        assert!(evaluate_condition_at(
            &msg,
            &cond("received_datetime", "older_than_days", text("5")),
            now()
        ));
    }

    #[test]
    fn newer_than_days_uses_the_older_than_comparison() {
        let one_day_old = Utc::now() - TimeDelta::days(1);
        assert!(!eval_date(one_day_old, &Predicate::NewerThanDays, 3, Utc::now()));
        assert!(eval_date(one_day_old, &Predicate::NewerThanDays, 0, Utc::now()));
    }

    #[test]
    fn month_predicates() {
        let received = Utc.with_ymd_and_hms(2024, 9, 15, 0, 0, 0).unwrap();
        // Received about two and a half months before now().
        assert!(eval_date(received, &Predicate::GreaterThanMonths, 2, now()));
        assert!(!eval_date(received, &Predicate::GreaterThanMonths, 3, now()));
        assert!(eval_date(received, &Predicate::LessThanMonths, 3, now()));
        assert!(!eval_date(received, &Predicate::LessThanMonths, 2, now()));
    }

    #[test]
    fn absent_date_value_is_zero() {
        let msg = record();
        assert!(evaluate_condition_at(
            &msg,
            &cond("received_datetime", "older_than_days", None),
            now()
        ));
    }

    #[test]
    fn non_numeric_date_value_is_false() {
        let msg = record();
        assert!(!evaluate_condition_at(
            &msg,
            &cond("received_datetime", "older_than_days", text("a week")),
            now()
        ));
    }

    #[test]
    fn empty_or_malformed_date_is_always_false() {
        for received_at in ["", "   ", "yesterday-ish"] {
            let msg = MessageRecord {
                received_at: received_at.into(),
                ..Default::default()
            };
            for predicate in [
                "older_than_days",
                "newer_than_days",
                "less_than_months",
                "greater_than_months",
            ] {
                for n in [-1000, 0, 1000] {
                    assert!(!evaluate_condition_at(
                        &msg,
                        &cond("received_datetime", predicate, int(n)),
                        now()
                    ));
                }
            }
        }
    }

    #[test]
    fn parses_header_dates() {
        let dt = parse_email_date("Wed, 20 Nov 2024 10:00:00 +0530").unwrap();
        assert_eq!(
            dt.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 11, 20, 4, 30, 0).unwrap()
        );
        assert!(parse_email_date("20 Nov 2024 10:00:00 GMT").is_some());
        assert!(parse_email_date("Wed, 20 Nov 2024 10:00:00 +0000 (UTC)").is_some());
    }

    #[test]
    fn parses_iso_dates() {
        let expected = Utc.with_ymd_and_hms(2024, 11, 20, 10, 0, 0).unwrap();
        for s in [
            "2024-11-20T10:00:00Z",
            "2024-11-20T10:00:00+00:00",
            "2024-11-20 10:00:00+0000",
            "2024-11-20T10:00:00",
            "2024-11-20 10:00:00.000",
        ] {
            let dt = parse_email_date(s).unwrap_or_else(|| panic!("failed to parse {s}"));
            assert_eq!(dt.with_timezone(&Utc), expected, "{s}");
        }
        assert!(parse_email_date("2024-11-20").is_some());
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(parse_email_date("").is_none());
        assert!(parse_email_date("not a date").is_none());
        assert!(parse_email_date("2024-13-45").is_none());
    }
}

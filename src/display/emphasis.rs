//! Alarm emphasis rule
//!
//! An entity qualifies for alarm styling when its data-point key carries a
//! recognized alarm suffix AND its current value is truthy under the rule
//! below. For multi-entity widgets the first qualifying entity in configured
//! order wins; emphasis is a single flag plus a CSS class, not a count.

use serde_json::Value;

/// CSS class applied to a widget in alarm state
pub const ALARM_EMPHASIS_CLASS: &str = "widget-alarm";

/// Key suffixes that mark an entity as alarm-capable (case-insensitive)
const ALARM_KEY_SUFFIXES: [&str; 2] = ["_alarm", "_status"];

/// Resolved emphasis for one widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Emphasis {
    pub active: bool,
    pub class: Option<&'static str>,
}

impl Emphasis {
    fn active() -> Self {
        Self {
            active: true,
            class: Some(ALARM_EMPHASIS_CLASS),
        }
    }
}

/// Does this data-point key mark an alarm-capable entity?
pub fn is_alarm_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    ALARM_KEY_SUFFIXES
        .iter()
        .any(|suffix| lowered.ends_with(suffix))
}

/// Truthiness as the alarm rule defines it: boolean `true`, a number above
/// zero, or a non-empty (after trim) string. Everything else, including
/// `false`, `0`, `""`, and null, is non-alarm.
///
/// Note the string branch is literal: any non-empty string qualifies, even
/// one that parses to zero or negative (`"0"` is truthy). Numeric and string
/// truthiness are intentionally asymmetric here; the backend emits alarm
/// states as strings and an empty string is the only "clear" marker.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v > 0.0).unwrap_or(false),
        Value::String(s) => !s.trim().is_empty(),
        _ => false,
    }
}

/// One entity qualifies when both the key and the value rule hold
pub fn qualifies(key: &str, value: &Value) -> bool {
    is_alarm_key(key) && is_truthy(value)
}

/// Resolve emphasis over (key, value) pairs in configured order; the first
/// qualifying entity wins.
pub fn resolve_emphasis<'a, I>(entries: I) -> Emphasis
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    for (key, value) in entries {
        if qualifies(key, value) {
            return Emphasis::active();
        }
    }
    Emphasis::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alarm_key_suffixes() {
        assert!(is_alarm_key("door_alarm"));
        assert!(is_alarm_key("humidity_status"));
        assert!(is_alarm_key("DOOR_ALARM"));
        assert!(!is_alarm_key("temperature"));
        assert!(!is_alarm_key("alarm_history"));
    }

    #[test]
    fn test_alarm_rule_matrix() {
        assert!(qualifies("door_alarm", &json!(true)));
        assert!(!qualifies("door_alarm", &json!(false)));
        // Wrong suffix never qualifies, truthy value or not
        assert!(!qualifies("temperature", &json!(true)));
        assert!(qualifies("pump_status", &json!(3)));
        assert!(!qualifies("pump_status", &json!(0)));
        assert!(!qualifies("pump_status", &json!(-1)));
    }

    #[test]
    fn test_string_truthiness_is_literal() {
        // "0" is a non-empty string and therefore truthy, even though it
        // parses to numeric zero
        assert!(qualifies("humidity_status", &json!("0")));
        assert!(qualifies("humidity_status", &json!("tripped")));
        assert!(!qualifies("humidity_status", &json!("")));
        assert!(!qualifies("humidity_status", &json!("   ")));
    }

    #[test]
    fn test_null_and_structured_values_are_non_alarm() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!([1, 2])));
        assert!(!is_truthy(&json!({"nested": true})));
    }

    #[test]
    fn test_first_qualifying_entity_wins() {
        let quiet = json!(false);
        let tripped = json!(true);
        let emphasis = resolve_emphasis([
            ("temperature", &tripped),
            ("door_alarm", &quiet),
            ("smoke_alarm", &tripped),
            ("heat_alarm", &tripped),
        ]);
        assert!(emphasis.active);
        assert_eq!(emphasis.class, Some(ALARM_EMPHASIS_CLASS));

        let none = resolve_emphasis([("temperature", &tripped), ("door_alarm", &quiet)]);
        assert!(!none.active);
        assert_eq!(none.class, None);
    }
}

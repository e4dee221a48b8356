//! Value formatting
//!
//! Every user-visible failure mode renders as the placeholder glyph; widgets
//! never show an error banner for an individual entity.

use rt_board_types::{EntityStatus, ValueAttribute};
use serde_json::Value;

/// Placeholder rendered for missing or non-displayable values
pub const VALUE_PLACEHOLDER: &str = "--";

/// Format a status value for display.
///
/// Missing status, null, blank strings, and structured values all render as
/// the placeholder. Numbers honor the attribute's precision (default: one
/// decimal, dropped for integral values) and unit suffix.
pub fn format_value(status: Option<&EntityStatus>, attribute: Option<&ValueAttribute>) -> String {
    let Some(status) = status else {
        return VALUE_PLACEHOLDER.to_string();
    };

    match &status.value {
        Value::Number(n) => match n.as_f64() {
            Some(v) => format_number(v, attribute),
            None => VALUE_PLACEHOLDER.to_string(),
        },
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                VALUE_PLACEHOLDER.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Value::Bool(b) => b.to_string(),
        _ => VALUE_PLACEHOLDER.to_string(),
    }
}

fn format_number(value: f64, attribute: Option<&ValueAttribute>) -> String {
    let precision = attribute.and_then(|a| a.precision);
    let rendered = match precision {
        Some(p) => format!("{:.*}", p as usize, value),
        // Integral values drop the decimal point entirely
        None if value.fract() == 0.0 => format!("{}", value as i64),
        None => format!("{:.1}", value),
    };

    match attribute.and_then(|a| a.unit.as_deref()) {
        Some(unit) => format!("{} {}", rendered, unit),
        None => rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn celsius(precision: Option<u32>) -> ValueAttribute {
        ValueAttribute {
            unit: Some("°C".to_string()),
            precision,
            ..ValueAttribute::default()
        }
    }

    #[test]
    fn test_missing_status_renders_placeholder() {
        assert_eq!(format_value(None, None), VALUE_PLACEHOLDER);
        assert_eq!(
            format_value(Some(&EntityStatus::new(json!(null))), None),
            VALUE_PLACEHOLDER
        );
        assert_eq!(
            format_value(Some(&EntityStatus::new(json!("  "))), None),
            VALUE_PLACEHOLDER
        );
        assert_eq!(
            format_value(Some(&EntityStatus::new(json!([1, 2]))), None),
            VALUE_PLACEHOLDER
        );
    }

    #[test]
    fn test_numbers_honor_precision_and_unit() {
        let status = EntityStatus::new(json!(21.456));
        assert_eq!(format_value(Some(&status), None), "21.5");
        assert_eq!(
            format_value(Some(&status), Some(&celsius(Some(2)))),
            "21.46 °C"
        );

        let integral = EntityStatus::new(json!(42.0));
        assert_eq!(format_value(Some(&integral), None), "42");
    }

    #[test]
    fn test_strings_and_booleans_pass_through() {
        assert_eq!(
            format_value(Some(&EntityStatus::new(json!("open"))), None),
            "open"
        );
        assert_eq!(
            format_value(Some(&EntityStatus::new(json!(true))), None),
            "true"
        );
    }
}

//! Record validation against the resource's field list. Failures aggregate
//! into a field -> messages mapping; nothing touches the database on failure.

use crate::error::FieldErrors;
use crate::registry::{Field, FieldRule, FieldType, Resource};
use regex::Regex;
use serde_json::{Map, Value};

/// Validate a record body. `partial` relaxes required checks for absent fields
/// (update semantics); present fields are always fully checked.
pub fn validate_record(
    resource: &Resource,
    body: &Map<String, Value>,
    partial: bool,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    for field in &resource.fields {
        if field.name == resource.primary_key {
            continue;
        }
        let value = body.get(&field.name);
        let missing = value.is_none() || value == Some(&Value::Null);
        if missing {
            let required_by_rule = field
                .rule
                .as_ref()
                .and_then(|r| r.required)
                .unwrap_or(false);
            let required_by_schema = !field.nullable && field.default.is_none();
            if (required_by_rule || required_by_schema) && !(partial && value.is_none()) {
                push(&mut errors, &field.name, "is required");
            }
            continue;
        }
        let value = value.expect("checked above");
        check_type(&mut errors, field, value);
        if let Some(rule) = &field.rule {
            check_rule(&mut errors, &field.name, value, rule);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn push(errors: &mut FieldErrors, field: &str, msg: &str) {
    errors.entry(field.to_string()).or_default().push(msg.to_string());
}

fn check_type(errors: &mut FieldErrors, field: &Field, value: &Value) {
    match &field.ftype {
        FieldType::Integer | FieldType::Reference { .. } | FieldType::Location => {
            if value.as_i64().is_none() {
                push(errors, &field.name, "must be an integer");
            }
        }
        FieldType::Double => {
            if value.as_f64().is_none() {
                push(errors, &field.name, "must be a number");
            }
        }
        FieldType::Decimal { precision, scale } => {
            check_decimal(errors, &field.name, value, *precision, *scale);
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                push(errors, &field.name, "must be a boolean");
            }
        }
        FieldType::Str | FieldType::Text | FieldType::Upload => {
            if !value.is_string() {
                push(errors, &field.name, "must be a string");
            }
        }
        FieldType::Choice(options) => match value.as_str() {
            Some(s) if options.iter().any(|o| o == s) => {}
            _ => push(errors, &field.name, "is not a valid option"),
        },
        FieldType::Date => {
            let ok = value
                .as_str()
                .map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
                .unwrap_or(false);
            if !ok {
                push(errors, &field.name, "must be a date (YYYY-MM-DD)");
            }
        }
        FieldType::DateTime | FieldType::Timestamp => {
            let ok = value
                .as_str()
                .map(|s| {
                    chrono::DateTime::parse_from_rfc3339(s).is_ok()
                        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
                        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
                })
                .unwrap_or(false);
            if !ok {
                push(errors, &field.name, "must be a datetime");
            }
        }
        FieldType::Json => {}
    }
}

/// Declared scale and precision are exact: excess fraction or integer digits
/// are rejections, not silent rounding.
fn check_decimal(errors: &mut FieldErrors, name: &str, value: &Value, precision: u8, scale: u8) {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => {
            push(errors, name, "must be a decimal");
            return;
        }
    };
    let unsigned = text.strip_prefix('-').unwrap_or(&text);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };
    if int_part.is_empty() && frac_part.is_empty()
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        push(errors, name, "must be a decimal");
        return;
    }
    if frac_part.len() > scale as usize {
        push(errors, name, &format!("must have at most {} decimal places", scale));
    }
    // saturating: a declaration with scale > precision admits no integer digits
    let int_digits = int_part.trim_start_matches('0').len();
    if int_digits > precision.saturating_sub(scale) as usize {
        push(errors, name, &format!("exceeds precision {}", precision));
    }
}

fn check_rule(errors: &mut FieldErrors, name: &str, value: &Value, rule: &FieldRule) {
    if let Some(s) = value.as_str() {
        if let Some(max) = rule.max_length {
            if s.chars().count() > max as usize {
                push(errors, name, &format!("must be at most {} characters", max));
            }
        }
        if let Some(min) = rule.min_length {
            if s.chars().count() < min as usize {
                push(errors, name, &format!("must be at least {} characters", min));
            }
        }
        if let Some(pattern) = &rule.pattern {
            match Regex::new(pattern) {
                Ok(re) => {
                    if !re.is_match(s) {
                        push(errors, name, "does not match the required pattern");
                    }
                }
                Err(_) => push(errors, name, "has an invalid pattern rule"),
            }
        }
        if let Some(format) = &rule.format {
            check_format(errors, name, s, format);
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| a == value) {
            push(errors, name, "is not an allowed value");
        }
    }
    if let Some(n) = value.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                push(errors, name, &format!("must be at least {}", min));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                push(errors, name, &format!("must be at most {}", max));
            }
        }
    }
    if let Some(predicate) = &rule.predicate {
        if let Err(msg) = predicate(value) {
            push(errors, name, &msg);
        }
    }
}

fn check_format(errors: &mut FieldErrors, name: &str, s: &str, format: &str) {
    match format.to_ascii_lowercase().as_str() {
        "email" => {
            if !s.contains('@') || s.len() < 3 {
                push(errors, name, "must be a valid email");
            }
        }
        "uuid" => {
            if uuid::Uuid::parse_str(s).is_err() {
                push(errors, name, "must be a valid UUID");
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Field, FieldRule, FieldType, Resource};
    use serde_json::json;

    fn course() -> Resource {
        Resource {
            prefix: "hrm".into(),
            name: "course".into(),
            fields: vec![
                Field::new("id", FieldType::Integer).not_null(),
                Field::new("name", FieldType::Str)
                    .not_null()
                    .rule(FieldRule::length(1, 128)),
                Field::new("fee", FieldType::Decimal { precision: 8, scale: 2 }),
                Field::new("level", FieldType::Choice(vec!["basic".into(), "advanced".into()])),
                Field::new("places", FieldType::Integer).rule(FieldRule::range(0.0, 500.0)),
                Field::new("start_date", FieldType::Date),
            ],
            primary_key: "id".into(),
            crud_strings: Default::default(),
            components: Vec::new(),
            rheader: None,
            custom_form: None,
            methods: Default::default(),
            filter_widgets: Vec::new(),
            customise: None,
        }
    }

    fn body(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn valid_record_passes() {
        let b = body(json!({
            "name": "Emergency First Aid",
            "fee": "25.00",
            "level": "basic",
            "places": 30,
            "start_date": "2026-09-01"
        }));
        assert!(validate_record(&course(), &b, false).is_ok());
    }

    #[test]
    fn missing_required_field_rejected() {
        let b = body(json!({"level": "basic"}));
        let errors = validate_record(&course(), &b, false).unwrap_err();
        assert!(errors.contains_key("name"));
    }

    #[test]
    fn partial_update_skips_absent_required_fields() {
        let b = body(json!({"level": "advanced"}));
        assert!(validate_record(&course(), &b, true).is_ok());
    }

    #[test]
    fn failures_aggregate_across_fields() {
        let b = body(json!({
            "name": "",
            "level": "expert",
            "places": 9000,
            "start_date": "tomorrow"
        }));
        let errors = validate_record(&course(), &b, false).unwrap_err();
        assert!(errors.contains_key("name"));
        assert!(errors.contains_key("level"));
        assert!(errors.contains_key("places"));
        assert!(errors.contains_key("start_date"));
    }

    #[test]
    fn decimal_scale_is_exact() {
        let b = body(json!({"name": "x", "fee": "25.005"}));
        let errors = validate_record(&course(), &b, false).unwrap_err();
        assert!(errors.contains_key("fee"));

        let b = body(json!({"name": "x", "fee": "1234567.00"}));
        let errors = validate_record(&course(), &b, false).unwrap_err();
        assert!(errors.contains_key("fee"));

        let b = body(json!({"name": "x", "fee": "125.50"}));
        assert!(validate_record(&course(), &b, false).is_ok());
    }

    #[test]
    fn decimal_scale_larger_than_precision_rejects_integer_digits() {
        let mut r = course();
        r.fields.push(Field::new("rate", FieldType::Decimal { precision: 2, scale: 5 }));

        let b = body(json!({"name": "x", "rate": "1.00000"}));
        let errors = validate_record(&r, &b, false).unwrap_err();
        assert!(errors.contains_key("rate"));

        let b = body(json!({"name": "x", "rate": "0.00500"}));
        assert!(validate_record(&r, &b, false).is_ok());
    }

    #[test]
    fn choice_outside_options_rejected() {
        let b = body(json!({"name": "x", "level": "expert"}));
        let errors = validate_record(&course(), &b, false).unwrap_err();
        assert_eq!(errors["level"], vec!["is not a valid option"]);
    }

    #[test]
    fn integer_bounds_enforced() {
        let b = body(json!({"name": "x", "places": -1}));
        let errors = validate_record(&course(), &b, false).unwrap_err();
        assert!(errors.contains_key("places"));
    }
}

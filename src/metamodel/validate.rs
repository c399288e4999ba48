use chrono::{DateTime, NaiveDate, NaiveTime, Weekday};
use serde::Serialize;
use serde_json::Value;

use super::model::{Format, Indicator, Metamodel};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub indicator: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl Metamodel {
    /// Validate `value` against the indicator named by `code` (code or key).
    pub fn validate(&self, code: &str, value: &Value) -> ValidationReport {
        match self.find(code) {
            Some(entry) => validate_value(entry.indicator, value),
            None => ValidationReport {
                valid: false,
                indicator: code.to_string(),
                value: value.clone(),
                format: None,
                errors: vec![format!("Indicator not found: {}", code)],
            },
        }
    }
}

pub fn validate_value(indicator: &Indicator, value: &Value) -> ValidationReport {
    let mut errors = Vec::new();
    check_format(indicator, value, &mut errors);
    check_range(indicator.min, indicator.max, value, "Value", &mut errors);

    ValidationReport {
        valid: errors.is_empty(),
        indicator: indicator.code.clone(),
        value: value.clone(),
        format: Some(indicator.format),
        errors,
    }
}

fn check_format(indicator: &Indicator, value: &Value, errors: &mut Vec<String>) {
    match indicator.format {
        Format::Integer => {
            if !is_integer(value) {
                errors.push(format!("Expected integer, got {}", type_name(value)));
            }
        }
        Format::Float => {
            if !value.is_number() {
                errors.push(format!("Expected number, got {}", type_name(value)));
            }
        }
        Format::Boolean => {
            if !value.is_boolean() {
                errors.push(format!("Expected boolean, got {}", type_name(value)));
            }
        }
        Format::String | Format::StructuredText => {
            if !value.is_string() {
                errors.push(format!("Expected string, got {}", type_name(value)));
            }
        }
        Format::Enum => {
            if let Some(allowed) = indicator.enum_values.as_deref()
                && !allowed.contains(value)
            {
                errors.push(format!("Value must be one of: {}", join_values(allowed)));
            }
        }
        Format::Date => {
            if !value.as_str().is_some_and(is_date) {
                errors.push("Expected valid date string (YYYY-MM-DD)".to_string());
            }
        }
        Format::Time => {
            if !value.as_str().is_some_and(is_time) {
                errors.push("Expected time string (HH:MM)".to_string());
            }
        }
        Format::DayTime => {
            if !value.as_str().is_some_and(is_day_time) {
                errors.push("Expected day of week and time (e.g. 'Mon 09:30')".to_string());
            }
        }
        Format::StringList => match value.as_array() {
            Some(items) => {
                if let Some(pos) = items.iter().position(|item| !item.is_string()) {
                    errors.push(format!(
                        "Expected list of strings, item {} is {}",
                        pos,
                        type_name(&items[pos])
                    ));
                }
            }
            None => errors.push(format!("Expected array, got {}", type_name(value))),
        },
        Format::ObjectList => match value.as_array() {
            Some(items) => {
                if let Some(pos) = items.iter().position(|item| !item.is_object()) {
                    errors.push(format!(
                        "Expected list of objects, item {} is {}",
                        pos,
                        type_name(&items[pos])
                    ));
                }
            }
            None => errors.push(format!("Expected array, got {}", type_name(value))),
        },
        Format::Checklist => {
            if !(value.is_array() || value.is_object()) {
                errors.push(format!("Expected object or array, got {}", type_name(value)));
            }
        }
        Format::Object => match value.as_object() {
            Some(fields) => {
                if let Some(schema) = indicator.schema.as_ref().and_then(Value::as_object) {
                    for (field, hint) in schema {
                        if let (Some(actual), Some(hint)) = (fields.get(field), hint.as_str()) {
                            check_schema_field(field, hint, actual, errors);
                        }
                    }
                }
            }
            None => errors.push(format!("Expected object, got {}", type_name(value))),
        },
    }
}

/// Checks one object field against a schema hint such as `1-5`, `string`
/// or `enum[a,b,c]`. Unknown hints accept anything.
fn check_schema_field(field: &str, hint: &str, actual: &Value, errors: &mut Vec<String>) {
    if hint == "string" {
        if !actual.is_string() {
            errors.push(format!("Field '{}': expected string, got {}", field, type_name(actual)));
        }
        return;
    }

    if let Some(options) = hint.strip_prefix("enum[").and_then(|rest| rest.strip_suffix(']')) {
        let matches = actual
            .as_str()
            .is_some_and(|s| options.split(',').any(|option| option.trim() == s));
        if !matches {
            errors.push(format!("Field '{}': value must be one of: {}", field, options));
        }
        return;
    }

    if let Some((min, max)) = parse_range(hint) {
        if !actual.is_number() {
            errors.push(format!("Field '{}': expected number, got {}", field, type_name(actual)));
            return;
        }
        check_range(Some(min), Some(max), actual, &format!("Field '{}'", field), errors);
    }
}

fn check_range(min: Option<f64>, max: Option<f64>, value: &Value, label: &str, errors: &mut Vec<String>) {
    let Some(number) = value.as_f64() else {
        return;
    };
    if let Some(min) = min
        && number < min
    {
        errors.push(format!("{} {} is below minimum {}", label, value, min));
    }
    if let Some(max) = max
        && number > max
    {
        errors.push(format!("{} {} is above maximum {}", label, value, max));
    }
}

fn parse_range(hint: &str) -> Option<(f64, f64)> {
    let (lo, hi) = hint.split_once('-')?;
    Some((lo.trim().parse().ok()?, hi.trim().parse().ok()?))
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}

fn is_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(s).is_ok()
}

fn is_time(s: &str) -> bool {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").is_ok()
}

fn is_day_time(s: &str) -> bool {
    let mut parts = s.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(day), Some(time), None) => day.parse::<Weekday>().is_ok() && is_time(time),
        _ => false,
    }
}

/// Type name in the vocabulary agents see in JSON Schema.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
